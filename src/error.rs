use crate::element::{NH, PH};

#[derive(Debug)]
pub enum Error {
    // Input validation.
    IndexOutOfBounds(u32, usize),
    IncorrectIndexCount(usize),
    MismatchedArrayLengths(usize, usize),
    // Topology.
    BrokenRelativeCycle(NH),
    BrokenSiblingRing(NH),
    RemovedNodeReference(NH),
    DanglingPositionIndex(PH),
    FaceCountMismatch(usize, usize),
    // Obj.
    ObjLoadFailed(String),
    ObjWriteFailed(String),
    IncorrectNumberOfCoordinates(usize),
}
