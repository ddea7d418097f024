//! Position mapping.
//!
//! Every step records which ranges it replaced as a [`StepMap`]. Positions
//! from before the step are carried through it with [`StepMap::map`]; a
//! [`Mapping`] chains the maps of a whole transaction.

/// Position is in the range deleted to its left.
const DEL_BEFORE: u8 = 1;
/// Position is in the range deleted to its right.
const DEL_AFTER: u8 = 2;
/// The token on both sides was deleted.
const DEL_ACROSS: u8 = 4;
/// The token on the side the position associates with was deleted.
const DEL_SIDE: u8 = 8;

/// The result of mapping a position, with deletion details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    del_info: u8,
}

impl MapResult {
    /// The content on the position's associated side was deleted.
    pub fn deleted(&self) -> bool {
        self.del_info & DEL_SIDE > 0
    }

    pub fn deleted_before(&self) -> bool {
        self.del_info & (DEL_BEFORE | DEL_ACROSS) > 0
    }

    pub fn deleted_after(&self) -> bool {
        self.del_info & (DEL_AFTER | DEL_ACROSS) > 0
    }

    pub fn deleted_across(&self) -> bool {
        self.del_info & DEL_ACROSS > 0
    }
}

/// Replaced ranges of one step, stored as `(start, old_size, new_size)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
    inverted: bool,
}

impl StepMap {
    pub fn new(ranges: Vec<(usize, usize, usize)>) -> Self {
        Self {
            ranges,
            inverted: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A map with a single replaced range.
    pub fn offset(pos: usize, old_size: usize, new_size: usize) -> Self {
        Self::new(vec![(pos, old_size, new_size)])
    }

    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }

    pub fn ranges(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.ranges.iter().map(move |&(start, old, new)| {
            if self.inverted {
                (start, new, old)
            } else {
                (start, old, new)
            }
        })
    }

    /// Map a position. `assoc < 0` keeps a position at an insertion point
    /// before the inserted content, otherwise after it.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut diff: isize = 0;
        let (old_index, new_index) = if self.inverted { (2, 1) } else { (1, 2) };
        for &range in &self.ranges {
            let parts = [range.0, range.1, range.2];
            let start = (parts[0] as isize - if self.inverted { diff } else { 0 }) as usize;
            if start > pos {
                break;
            }
            let old_size = parts[old_index];
            let new_size = parts[new_index];
            let end = start + old_size;
            if pos <= end {
                let side: i8 = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let base = start as isize + diff;
                let result = if side < 0 { base } else { base + new_size as isize };
                let mut del_info = if pos == if assoc < 0 { start } else { end } {
                    0
                } else {
                    DEL_SIDE
                };
                if pos != start && pos != end {
                    del_info |= DEL_ACROSS;
                } else if pos == start {
                    if old_size > 0 {
                        del_info |= DEL_AFTER;
                    }
                } else if old_size > 0 {
                    del_info |= DEL_BEFORE;
                }
                if old_size == 0 {
                    del_info = 0;
                }
                return MapResult {
                    pos: result.max(0) as usize,
                    del_info,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff).max(0) as usize,
            del_info: 0,
        }
    }
}

/// The step maps of a transaction, applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        Self { maps }
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn append_mapping(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().cloned());
    }

    /// The maps from index `from` onwards.
    pub fn slice(&self, from: usize) -> Mapping {
        Mapping {
            maps: self.maps[from.min(self.maps.len())..].to_vec(),
        }
    }

    /// Mapping that undoes this one.
    pub fn invert(&self) -> Mapping {
        Mapping {
            maps: self.maps.iter().rev().map(StepMap::invert).collect(),
        }
    }

    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    /// Map through every step, accumulating deletion flags.
    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut del_info = 0;
        let mut pos = pos;
        for map in &self.maps {
            let result = map.map_result(pos, assoc);
            del_info |= result.del_info;
            pos = result.pos;
        }
        MapResult { pos, del_info }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_moves_later_positions() {
        let map = StepMap::offset(5, 0, 3);
        assert_eq!(map.map(2, 1), 2);
        assert_eq!(map.map(5, 1), 8);
        assert_eq!(map.map(5, -1), 5);
        assert_eq!(map.map(9, 1), 12);
        assert!(!map.map_result(5, 1).deleted());
    }

    #[test]
    fn test_deletion_collapses_range() {
        let map = StepMap::offset(4, 4, 0);
        assert_eq!(map.map(3, 1), 3);
        assert_eq!(map.map(6, 1), 4);
        assert_eq!(map.map(10, 1), 6);

        let inside = map.map_result(6, 1);
        assert!(inside.deleted());
        assert!(inside.deleted_across());

        let at_start = map.map_result(4, 1);
        assert!(at_start.deleted());
        assert!(at_start.deleted_after());
        assert!(!at_start.deleted_across());

        let at_start_left = map.map_result(4, -1);
        assert!(!at_start_left.deleted());
    }

    #[test]
    fn test_inverted_map_restores_positions() {
        let map = StepMap::offset(4, 2, 5);
        let inverse = map.invert();
        for pos in [0, 3, 4, 6, 12] {
            let forward = map.map(pos, 1);
            if pos <= 4 || pos >= 6 {
                assert_eq!(inverse.map(forward, 1), pos);
            }
        }
    }

    #[test]
    fn test_mapping_chains_maps() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::offset(1, 0, 2));
        mapping.append_map(StepMap::offset(10, 3, 0));
        assert_eq!(mapping.map(5, 1), 7);
        assert_eq!(mapping.map(14, 1), 13);
        assert_eq!(mapping.slice(1).map(5, 1), 5);
        assert!(mapping.map_result(9, 1).deleted());
    }
}
