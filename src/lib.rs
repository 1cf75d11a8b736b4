// Page curl: re-tessellates a flat page into a curled triangle strip and
// drives the three-page turn state machine around it.

pub mod engine;
