use serde::{Deserialize, Serialize};

use crate::{BlockPos, EntityId, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Stand exactly on the target block.
    ExactBlock,
    /// Get within `tolerance` of a point.
    NearPoint,
    /// Stay within `tolerance` of a (moving) entity.
    NearEntity,
    /// Get at least `tolerance` away from a point.
    Inverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GoalTarget {
    Point(Vec3),
    Entity(EntityId),
}

/// Navigation intent consumed by `WorldInterface::move_to`.
///
/// Goals are immutable values. `dynamic` goals are re-evaluated every tick
/// because their target moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub kind: GoalKind,
    pub target: GoalTarget,
    pub tolerance: f64,
    pub dynamic: bool,
}

impl Goal {
    pub fn exact_block(pos: BlockPos) -> Self {
        Self {
            kind: GoalKind::ExactBlock,
            target: GoalTarget::Point(pos.as_vec3()),
            tolerance: 0.0,
            dynamic: false,
        }
    }

    pub fn near_point(point: Vec3, tolerance: f64) -> Self {
        Self {
            kind: GoalKind::NearPoint,
            target: GoalTarget::Point(point),
            tolerance: tolerance.max(0.0),
            dynamic: false,
        }
    }

    /// `tolerance == 0` yields an exact-block goal, anything else a near goal.
    pub fn for_point(point: Vec3, tolerance: f64) -> Self {
        if tolerance <= 0.0 {
            Self::exact_block(point.floored())
        } else {
            Self::near_point(point, tolerance)
        }
    }

    pub fn near_entity(entity: EntityId, tolerance: f64) -> Self {
        Self {
            kind: GoalKind::NearEntity,
            target: GoalTarget::Entity(entity),
            tolerance: tolerance.max(0.0),
            dynamic: true,
        }
    }

    /// Avoid `point`: satisfied once the agent is at least `distance` away.
    pub fn inverted(point: Vec3, distance: f64) -> Self {
        Self {
            kind: GoalKind::Inverted,
            target: GoalTarget::Point(point),
            tolerance: distance.max(0.0),
            dynamic: false,
        }
    }

    pub fn point(&self) -> Option<Vec3> {
        match self.target {
            GoalTarget::Point(p) => Some(p),
            GoalTarget::Entity(_) => None,
        }
    }

    pub fn entity(&self) -> Option<EntityId> {
        match self.target {
            GoalTarget::Entity(e) => Some(e),
            GoalTarget::Point(_) => None,
        }
    }

    /// Whether an agent at `agent` satisfies the goal.
    ///
    /// `target` is the resolved target position (the entity's current
    /// position for entity goals); `None` means the target is unknown and the
    /// goal cannot be satisfied.
    pub fn is_satisfied(&self, agent: Vec3, target: Option<Vec3>) -> bool {
        let Some(target) = target.or_else(|| self.point()) else {
            return false;
        };
        match self.kind {
            GoalKind::ExactBlock => agent.floored() == target.floored(),
            GoalKind::NearPoint | GoalKind::NearEntity => agent.distance(target) <= self.tolerance,
            GoalKind::Inverted => agent.distance(target) >= self.tolerance,
        }
    }
}
