pub mod media;
pub mod pose;
