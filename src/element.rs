use std::fmt::{Debug, Display};

/// Sentinel written into a node's position slot to mark it removed.
const REMOVED: u32 = u32::MAX;

/**
 * All elements of the mesh implement this trait. They are identified by their
 * index.
 */
pub trait Handle {
    /**
     * The index of the element.
     */
    fn index(&self) -> u32;
}

/**
 * Position handle. A position is a distinct point location that may be shared
 * by several corners.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PH {
    idx: u32,
}

/**
 * Attribute handle. An attribute is one (normal, uv) instance; corners
 * sharing a position may reference different attributes across a seam.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AH {
    idx: u32,
}

/**
 * Node handle. A node is one triangle corner.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NH {
    idx: u32,
}

impl Handle for PH {
    fn index(&self) -> u32 {
        self.idx
    }
}

impl From<u32> for PH {
    fn from(idx: u32) -> Self {
        PH { idx }
    }
}

impl Handle for AH {
    fn index(&self) -> u32 {
        self.idx
    }
}

impl From<u32> for AH {
    fn from(idx: u32) -> Self {
        AH { idx }
    }
}

impl Handle for NH {
    fn index(&self) -> u32 {
        self.idx
    }
}

impl From<u32> for NH {
    fn from(idx: u32) -> Self {
        NH { idx }
    }
}

impl Display for PH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PH({})", self.index())
    }
}

impl Display for AH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AH({})", self.index())
    }
}

impl Display for NH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NH({})", self.index())
    }
}

impl Debug for PH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PH({})", self.index())
    }
}

impl Debug for AH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AH({})", self.index())
    }
}

impl Debug for NH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NH({})", self.index())
    }
}

/**
 * One triangle corner.
 *
 * `relative` links the three corners of a face into an exact 3-cycle.
 * `sibling` links all live corners sharing one position into a closed ring.
 * A removed node keeps its links until compaction; only its position slot is
 * overwritten with a sentinel.
 */
#[derive(Debug, Copy, Clone)]
pub(crate) struct Node {
    pub(crate) position: PH,
    pub(crate) attribute: AH,
    pub(crate) relative: NH,
    pub(crate) sibling: NH,
}

impl Node {
    pub fn mark_removed(&mut self) {
        self.position = REMOVED.into();
    }

    pub fn is_removed(&self) -> bool {
        self.position.index() == REMOVED
    }
}

#[cfg(test)]
mod test {
    use super::{AH, Handle, NH, Node, PH};

    #[test]
    fn t_handle_roundtrip() {
        let p: PH = 42.into();
        let a: AH = 7.into();
        let n: NH = 0.into();
        assert_eq!(p.index(), 42);
        assert_eq!(a.index(), 7);
        assert_eq!(n.index(), 0);
        assert_eq!(format!("{}", p), "PH(42)");
    }

    #[test]
    fn t_node_removal_sentinel() {
        let mut node = Node {
            position: 3.into(),
            attribute: 3.into(),
            relative: 1.into(),
            sibling: 2.into(),
        };
        assert!(!node.is_removed());
        node.mark_removed();
        assert!(node.is_removed());
        // Links survive removal until compaction.
        assert_eq!(node.relative, 1.into());
        assert_eq!(node.sibling, 2.into());
    }
}
