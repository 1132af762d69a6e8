//! Agent size classes. Every distinct [`AgentBounds`] value owns its own navmesh.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Collision volume used by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentShape {
    /// Axis aligned box; the horizontal reach is the half-diagonal
    Aabb,
    /// Upright cylinder
    Cylinder,
}

/// Size of an agent class.
///
/// Equality, ordering and hashing are value based over the bit patterns of
/// the float fields so the type can be used as a map key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentBounds {
    pub shape: AgentShape,
    pub half_height: f32,
    pub radius: f32,
}

impl AgentBounds {
    pub fn new(shape: AgentShape, half_height: f32, radius: f32) -> Self {
        Self {
            shape,
            half_height,
            radius,
        }
    }

    pub fn cylinder(half_height: f32, radius: f32) -> Self {
        Self::new(AgentShape::Cylinder, half_height, radius)
    }

    /// Horizontal distance the agent body reaches from its center
    pub fn effective_radius(&self) -> f32 {
        match self.shape {
            AgentShape::Aabb => self.radius * std::f32::consts::SQRT_2,
            AgentShape::Cylinder => self.radius,
        }
    }

    pub fn height(&self) -> f32 {
        self.half_height * 2.0
    }

    pub fn is_valid(&self) -> bool {
        self.half_height.is_finite()
            && self.radius.is_finite()
            && self.half_height > 0.0
            && self.radius >= 0.0
    }

    /// Little endian encoding used for content hashes
    pub fn to_bytes(&self) -> [u8; 9] {
        let mut bytes = [0u8; 9];
        bytes[0] = self.shape as u8;
        bytes[1..5].copy_from_slice(&self.half_height.to_le_bytes());
        bytes[5..9].copy_from_slice(&self.radius.to_le_bytes());
        bytes
    }
}

impl PartialEq for AgentBounds {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AgentBounds {}

impl PartialOrd for AgentBounds {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AgentBounds {
    fn cmp(&self, other: &Self) -> Ordering {
        self.shape
            .cmp(&other.shape)
            .then_with(|| self.half_height.total_cmp(&other.half_height))
            .then_with(|| self.radius.total_cmp(&other.radius))
    }
}

impl Hash for AgentBounds {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape.hash(state);
        self.half_height.to_bits().hash(state);
        self.radius.to_bits().hash(state);
    }
}
