//! Per-order free lists, linked through the descriptor arena.

use crate::page::PageArena;
use crate::pfn::Pfn;

/// The free list of a single order: the heads of all currently-free,
/// unsplit blocks of that order, in strictly ascending frame order.
///
/// The links live inside the page descriptors ("next frame number or
/// none"), so list manipulation is index arithmetic and never touches
/// raw pointers.
#[derive(Debug, Clone, Copy)]
pub struct FreeArea {
    head: Option<Pfn>,
}

impl FreeArea {
    /// A free list without any blocks.
    pub const EMPTY: Self = Self { head: None };

    /// Returns whether this list has no free blocks.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// The free block with the lowest frame number, if any.
    pub fn first(&self) -> Option<Pfn> {
        self.head
    }

    /// Insert the block headed by `pfn`, preserving ascending order.
    ///
    /// The caller guarantees the block is not already a member of any
    /// free list; a double insert corrupts the list.
    pub fn insert(&mut self, arena: &mut PageArena<'_>, pfn: Pfn) {
        match self.head {
            Some(head) if head < pfn => {
                // walk to the last head below `pfn`, then splice
                let mut prev = head;
                while let Some(next) = arena.link(prev) {
                    if next >= pfn {
                        break;
                    }
                    prev = next;
                }

                debug_assert_ne!(arena.link(prev), Some(pfn), "double insert of {:x}", pfn);
                arena.set_link(pfn, arena.link(prev));
                arena.set_link(prev, Some(pfn));
            }
            _ => {
                debug_assert_ne!(self.head, Some(pfn), "double insert of {:x}", pfn);
                arena.set_link(pfn, self.head);
                self.head = Some(pfn);
            }
        }
    }

    /// Find and unlink the block headed by `pfn`.
    ///
    /// # Panics
    ///
    /// Panics if the block is not a member of this list. Removal of an
    /// absent block means the free-list table no longer partitions the
    /// page range, and carrying on would hand out pages twice.
    pub fn remove(&mut self, arena: &mut PageArena<'_>, pfn: Pfn) {
        if self.head == Some(pfn) {
            self.head = arena.link(pfn);
            arena.set_link(pfn, None);
            return;
        }

        let mut prev = self.head;
        while let Some(cur) = prev {
            if arena.link(cur) == Some(pfn) {
                arena.set_link(cur, arena.link(pfn));
                arena.set_link(pfn, None);
                return;
            }
            prev = arena.link(cur);
        }

        panic!("free list does not contain block {:x}", pfn);
    }

    /// Returns whether the block headed by `pfn` is a member of this list.
    pub fn contains(&self, arena: &PageArena<'_>, pfn: Pfn) -> bool {
        self.iter(arena).any(|head| head == pfn)
    }

    /// Iterate over the free block heads, in ascending frame order.
    pub fn iter<'a, 'pg>(&self, arena: &'a PageArena<'pg>) -> Iter<'a, 'pg> {
        Iter {
            arena,
            next: self.head,
        }
    }
}

/// Iterator over the block heads of a [`FreeArea`].
pub struct Iter<'a, 'pg> {
    arena: &'a PageArena<'pg>,
    next: Option<Pfn>,
}

impl Iterator for Iter<'_, '_> {
    type Item = Pfn;

    fn next(&mut self) -> Option<Pfn> {
        let head = self.next?;
        self.next = self.arena.link(head);
        Some(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageDescriptor;

    fn collect(area: &FreeArea, arena: &PageArena<'_>) -> Vec<usize> {
        area.iter(arena).map(usize::from).collect()
    }

    #[test]
    fn insert_keeps_ascending_order() {
        let mut pages = [PageDescriptor::new(); 16];
        let mut arena = PageArena::new(Pfn::new(0), &mut pages);
        let mut area = FreeArea::EMPTY;

        for &pfn in &[8, 2, 12, 0, 10] {
            area.insert(&mut arena, Pfn::new(pfn));
        }

        assert_eq!(collect(&area, &arena), &[0, 2, 8, 10, 12]);
        assert_eq!(area.first(), Some(Pfn::new(0)));
    }

    #[test]
    fn remove_head_middle_and_tail() {
        let mut pages = [PageDescriptor::new(); 16];
        let mut arena = PageArena::new(Pfn::new(0), &mut pages);
        let mut area = FreeArea::EMPTY;

        for pfn in 0..5 {
            area.insert(&mut arena, Pfn::new(pfn));
        }

        area.remove(&mut arena, Pfn::new(0));
        assert_eq!(collect(&area, &arena), &[1, 2, 3, 4]);

        area.remove(&mut arena, Pfn::new(2));
        assert_eq!(collect(&area, &arena), &[1, 3, 4]);

        area.remove(&mut arena, Pfn::new(4));
        assert_eq!(collect(&area, &arena), &[1, 3]);
    }

    #[test]
    fn removed_blocks_drop_their_link() {
        let mut pages = [PageDescriptor::new(); 4];
        let mut arena = PageArena::new(Pfn::new(0), &mut pages);
        let mut area = FreeArea::EMPTY;

        area.insert(&mut arena, Pfn::new(0));
        area.insert(&mut arena, Pfn::new(2));
        area.remove(&mut arena, Pfn::new(0));

        assert_eq!(arena.link(Pfn::new(0)), None);
    }

    #[test]
    fn contains_finds_members_only() {
        let mut pages = [PageDescriptor::new(); 8];
        let mut arena = PageArena::new(Pfn::new(0), &mut pages);
        let mut area = FreeArea::EMPTY;

        area.insert(&mut arena, Pfn::new(4));
        area.insert(&mut arena, Pfn::new(6));

        assert!(area.contains(&arena, Pfn::new(4)));
        assert!(area.contains(&arena, Pfn::new(6)));
        assert!(!area.contains(&arena, Pfn::new(5)));
        // membership is a plain comparison, a frame outside the arena
        // is simply not found
        assert!(!area.contains(&arena, Pfn::new(64)));
    }

    #[test]
    #[should_panic(expected = "free list does not contain block")]
    fn removing_an_absent_block_is_fatal() {
        let mut pages = [PageDescriptor::new(); 8];
        let mut arena = PageArena::new(Pfn::new(0), &mut pages);
        let mut area = FreeArea::EMPTY;

        area.insert(&mut arena, Pfn::new(0));
        area.remove(&mut arena, Pfn::new(4));
    }

    #[test]
    fn empty_list_reports_empty() {
        let mut pages = [PageDescriptor::new(); 2];
        let arena = PageArena::new(Pfn::new(0), &mut pages);
        let area = FreeArea::EMPTY;

        assert!(area.is_empty());
        assert_eq!(area.first(), None);
        assert_eq!(collect(&area, &arena), Vec::<usize>::new());
    }
}
