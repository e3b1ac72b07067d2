use crate::{collision::CollisionWorld, rooms::RoomSet};

/// Everything a probe or integrator may read about the world during one tick.
///
/// Borrowed immutably for the tick; moving dynamic bodies happens between ticks.
#[derive(Clone, Copy)]
pub struct SimulationContext<'a> {
    pub world: &'a dyn CollisionWorld,
    pub rooms: &'a RoomSet,
}

impl<'a> SimulationContext<'a> {
    pub fn new(world: &'a dyn CollisionWorld, rooms: &'a RoomSet) -> Self {
        Self { world, rooms }
    }
}
