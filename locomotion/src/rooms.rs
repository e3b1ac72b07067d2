//! Room and sector grid.
//!
//! Each room covers an axis-aligned box split horizontally into square sectors. Sectors
//! carry floor/ceiling heights and flags, and link vertically to the sector in the room
//! stacked above or below (e.g. the air room over a pool).

use crate::{
    collision::Vec3,
    constants::SECTOR_SIZE,
    flags::{SectorFlag, SectorFlags},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SectorRef {
    pub room: usize,
    pub sector: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Sector {
    pub floor: f32,
    pub ceiling: f32,
    pub flags: SectorFlags,
    pub above: Option<SectorRef>,
    pub below: Option<SectorRef>,
}

impl Sector {
    pub fn new(floor: f32, ceiling: f32) -> Self {
        Self {
            floor,
            ceiling,
            ..Default::default()
        }
    }

    pub fn with_flag(mut self, flag: SectorFlag) -> Self {
        self.flags.add(flag);
        self
    }

    #[inline]
    pub fn has(&self, flag: SectorFlag) -> bool {
        self.flags.has(flag)
    }
}

#[derive(Clone, Debug)]
pub struct Room {
    pub id: u32,
    /// World-space corner with the smallest x and y.
    pub origin_x: f32,
    pub origin_y: f32,
    /// Sector counts along x and y.
    pub width: usize,
    pub depth: usize,
    pub bottom: f32,
    pub top: f32,
    /// Row-major by y: index = ix * depth + iy.
    pub sectors: Vec<Sector>,
}

impl Room {
    /// Room filled with copies of `template`.
    pub fn uniform(
        id: u32,
        origin: (f32, f32),
        size: (usize, usize),
        heights: (f32, f32),
        template: Sector,
    ) -> Self {
        Self {
            id,
            origin_x: origin.0,
            origin_y: origin.1,
            width: size.0,
            depth: size.1,
            bottom: heights.0,
            top: heights.1,
            sectors: vec![template; size.0 * size.1],
        }
    }

    pub fn contains(&self, p: &Vec3) -> bool {
        self.contains_xy(p) && p.z >= self.bottom && p.z < self.top
    }

    fn contains_xy(&self, p: &Vec3) -> bool {
        p.x >= self.origin_x
            && p.y >= self.origin_y
            && p.x < self.origin_x + self.width as f32 * SECTOR_SIZE
            && p.y < self.origin_y + self.depth as f32 * SECTOR_SIZE
    }

    /// Index of the sector column under `p`, ignoring height.
    pub fn sector_index_at(&self, p: &Vec3) -> Option<usize> {
        if !self.contains_xy(p) {
            return None;
        }
        let ix = ((p.x - self.origin_x) / SECTOR_SIZE) as usize;
        let iy = ((p.y - self.origin_y) / SECTOR_SIZE) as usize;
        Some(ix.min(self.width - 1) * self.depth + iy.min(self.depth - 1))
    }
}

#[derive(Clone, Debug, Default)]
pub struct RoomSet {
    rooms: Vec<Room>,
}

impl RoomSet {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, index: usize) -> Option<&Room> {
        self.rooms.get(index)
    }

    /// Room containing `p`, trying `hint` first.
    pub fn find_room_containing(&self, p: &Vec3, hint: Option<usize>) -> Option<usize> {
        if let Some(h) = hint {
            if self.rooms.get(h).is_some_and(|r| r.contains(p)) {
                return Some(h);
            }
        }
        self.rooms.iter().position(|r| r.contains(p))
    }

    pub fn sector(&self, r: SectorRef) -> Option<&Sector> {
        self.rooms.get(r.room)?.sectors.get(r.sector)
    }

    /// Sector under `p` in the room containing it.
    pub fn sector_at(&self, p: &Vec3, hint: Option<usize>) -> Option<(SectorRef, &Sector)> {
        let room = self.find_room_containing(p, hint)?;
        let sector = self.rooms[room].sector_index_at(p)?;
        let r = SectorRef { room, sector };
        self.sector(r).map(|s| (r, s))
    }

    /// Link `lower` and `upper` as vertical neighbours.
    pub fn link_vertical(&mut self, lower: SectorRef, upper: SectorRef) {
        if let Some(s) = self.sector_mut(lower) {
            s.above = Some(upper);
        }
        if let Some(s) = self.sector_mut(upper) {
            s.below = Some(lower);
        }
    }

    /// Link every sector column of two rooms with identical grids.
    pub fn stack_rooms(&mut self, lower: usize, upper: usize) {
        let count = self.rooms.get(lower).map_or(0, |r| r.sectors.len());
        for sector in 0..count {
            self.link_vertical(
                SectorRef {
                    room: lower,
                    sector,
                },
                SectorRef {
                    room: upper,
                    sector,
                },
            );
        }
    }

    fn sector_mut(&mut self, r: SectorRef) -> Option<&mut Sector> {
        self.rooms.get_mut(r.room)?.sectors.get_mut(r.sector)
    }
}
