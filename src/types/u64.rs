/// Integer type used for vertex and triangle ids
pub type IndexType = u64;
