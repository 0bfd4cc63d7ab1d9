use super::*;

mod shim_collections_and_matching;
