//! Interaction gate: suspension points that need validated player input.
//!
//! An outcome that needs a target the game cannot pick on its own (which hex
//! gets the new worksite, which hexes are claimed) declares an
//! [`InteractionSpec`]. The pipeline turns it into an [`InteractionRequest`]
//! and suspends the instance until a [`Selection`] passes
//! [`InteractionGate::validate`] against a fresh snapshot.

use crate::pipeline::InstanceId;
use crate::state::{Hex, HexId, KingdomState, Terrain, WorksiteKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionKind {
    #[default]
    HexSelection,
}

/// Pure predicate over a candidate hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HexConstraint {
    Claimed,
    Unclaimed,
    /// Next to claimed territory, or to a hex picked earlier in the same batch.
    AdjacentToClaimed,
    WithoutWorksite,
    /// Terrain allows at least one kind of worksite.
    SupportsWorksite,
    Terrain { allowed: Vec<Terrain> },
}

impl HexConstraint {
    /// `earlier` holds the hexes already accepted in the same selection.
    pub fn check(&self, state: &KingdomState, hex: &Hex, earlier: &[HexId]) -> Result<(), String> {
        let ok = match self {
            HexConstraint::Claimed => hex.claimed,
            HexConstraint::Unclaimed => !hex.claimed,
            HexConstraint::AdjacentToClaimed => {
                state.is_adjacent_to_claimed(&hex.id)
                    || hex.neighbors.iter().any(|n| earlier.contains(n))
            }
            HexConstraint::WithoutWorksite => hex.worksite.is_none(),
            HexConstraint::SupportsWorksite => WorksiteKind::for_terrain(hex.terrain).is_some(),
            HexConstraint::Terrain { allowed } => allowed.contains(&hex.terrain),
        };
        if ok {
            return Ok(());
        }

        Err(match self {
            HexConstraint::Claimed => format!("Hex {} is not part of the kingdom", hex.id),
            HexConstraint::Unclaimed => format!("Hex {} is already claimed", hex.id),
            HexConstraint::AdjacentToClaimed => {
                format!("Hex {} is not adjacent to claimed territory", hex.id)
            }
            HexConstraint::WithoutWorksite => format!("Hex {} already has a worksite", hex.id),
            HexConstraint::SupportsWorksite => {
                format!("No worksite can be built on {:?} hex {}", hex.terrain, hex.id)
            }
            HexConstraint::Terrain { allowed } => format!(
                "Hex {} is {:?}, expected one of {:?}",
                hex.id, hex.terrain, allowed
            ),
        })
    }
}

fn default_count() -> u32 {
    1
}

fn default_required() -> bool {
    true
}

/// Interaction declared by an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionSpec {
    #[serde(default)]
    pub kind: InteractionKind,
    pub title: String,
    /// Maximum number of hexes the player may pick.
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub constraints: Vec<HexConstraint>,
    /// Required interactions block execute until satisfied.
    #[serde(default = "default_required")]
    pub required: bool,
}

/// What the caller must present to a human before the instance can resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRequest {
    pub instance: InstanceId,
    pub event_id: String,
    pub spec: InteractionSpec,
}

/// Input supplied by the interaction collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub hexes: Vec<HexId>,
}

impl Selection {
    pub fn hexes<I, S>(hexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<HexId>,
    {
        Self {
            hexes: hexes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub hex: Option<HexId>,
    pub reason: String,
}

impl Rejection {
    fn new(hex: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            hex: hex.map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Validated interaction results attached to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolutionData {
    pub selected_hexes: Vec<HexId>,
}

impl ResolutionData {
    pub fn is_empty(&self) -> bool {
        self.selected_hexes.is_empty()
    }
}

pub struct InteractionGate;

impl InteractionGate {
    pub fn request(instance: InstanceId, event_id: &str, spec: &InteractionSpec) -> InteractionRequest {
        InteractionRequest {
            instance,
            event_id: event_id.to_string(),
            spec: spec.clone(),
        }
    }

    /// Check a selection against the request and the current state.
    ///
    /// `state` must be a fresh snapshot, not the one the preview used.
    pub fn validate(
        request: &InteractionRequest,
        state: &KingdomState,
        selection: &Selection,
    ) -> Result<ResolutionData, Rejection> {
        let max = request.spec.count.max(1) as usize;
        if selection.hexes.is_empty() {
            return Err(Rejection::new(None, "Select at least one hex"));
        }
        if selection.hexes.len() > max {
            return Err(Rejection::new(
                None,
                format!("Select at most {} hex(es), got {}", max, selection.hexes.len()),
            ));
        }

        let mut accepted: Vec<HexId> = Vec::with_capacity(selection.hexes.len());
        for id in &selection.hexes {
            if accepted.contains(id) {
                return Err(Rejection::new(Some(id), format!("Hex {id} selected twice")));
            }
            let hex = state
                .hexes
                .get(id)
                .ok_or_else(|| Rejection::new(Some(id), format!("Hex {id} does not exist")))?;
            for constraint in &request.spec.constraints {
                constraint
                    .check(state, hex, &accepted)
                    .map_err(|reason| Rejection::new(Some(id), reason))?;
            }
            accepted.push(id.clone());
        }

        Ok(ResolutionData {
            selected_hexes: accepted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KingdomStateBuilder;

    fn claim_request(count: u32) -> InteractionRequest {
        InteractionGate::request(
            InstanceId(1),
            "land-rush",
            &InteractionSpec {
                kind: InteractionKind::HexSelection,
                title: "Claim hexes".to_string(),
                count,
                constraints: vec![HexConstraint::Unclaimed, HexConstraint::AdjacentToClaimed],
                required: true,
            },
        )
    }

    fn frontier() -> KingdomState {
        KingdomStateBuilder::new()
            .with_hex("1.1", Terrain::Plains, true, &["1.2"])
            .with_hex("1.2", Terrain::Forest, false, &["1.1", "1.3"])
            .with_hex("1.3", Terrain::Hills, false, &["1.2", "1.4"])
            .with_hex("1.4", Terrain::Lake, false, &["1.3"])
            .build()
    }

    #[test]
    fn test_accepts_valid_selection() {
        let data =
            InteractionGate::validate(&claim_request(1), &frontier(), &Selection::hexes(["1.2"]))
                .unwrap();
        assert_eq!(data.selected_hexes, vec!["1.2".to_string()]);
    }

    #[test]
    fn test_adjacency_chains_through_same_batch() {
        let state = frontier();
        let request = claim_request(2);

        // 1.3 is only adjacent to claimed land through 1.2 picked first.
        assert!(InteractionGate::validate(&request, &state, &Selection::hexes(["1.2", "1.3"])).is_ok());

        let rejection =
            InteractionGate::validate(&request, &state, &Selection::hexes(["1.3", "1.2"]))
                .unwrap_err();
        assert_eq!(rejection.hex.as_deref(), Some("1.3"));
    }

    #[test]
    fn test_rejects_duplicates_and_unknown() {
        let state = frontier();
        let request = claim_request(3);

        let rejection =
            InteractionGate::validate(&request, &state, &Selection::hexes(["1.2", "1.2"]))
                .unwrap_err();
        assert!(rejection.reason.contains("twice"));

        let rejection =
            InteractionGate::validate(&request, &state, &Selection::hexes(["7.7"])).unwrap_err();
        assert!(rejection.reason.contains("does not exist"));
    }

    #[test]
    fn test_rejects_wrong_size() {
        let state = frontier();
        assert!(InteractionGate::validate(&claim_request(1), &state, &Selection::default()).is_err());
        assert!(InteractionGate::validate(
            &claim_request(1),
            &state,
            &Selection::hexes(["1.2", "1.3"])
        )
        .is_err());
    }

    #[test]
    fn test_constraint_reasons() {
        let state = frontier();
        let hex = &state.hexes["1.4"];
        assert!(HexConstraint::SupportsWorksite
            .check(&state, hex, &[])
            .unwrap_err()
            .contains("No worksite"));
        assert!(HexConstraint::Claimed.check(&state, hex, &[]).is_err());
        assert!(HexConstraint::Terrain {
            allowed: vec![Terrain::Lake]
        }
        .check(&state, hex, &[])
        .is_ok());
    }

    #[test]
    fn test_spec_defaults_from_json() {
        let spec: InteractionSpec =
            serde_json::from_str(r#"{"title": "Pick", "constraints": ["claimed", "without-worksite"]}"#)
                .unwrap();
        assert_eq!(spec.count, 1);
        assert!(spec.required);
        assert_eq!(spec.kind, InteractionKind::HexSelection);
        assert_eq!(
            spec.constraints,
            vec![HexConstraint::Claimed, HexConstraint::WithoutWorksite]
        );
    }
}
