pub mod scenefile;
pub mod skeletonfile;
