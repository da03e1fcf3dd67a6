// Data models for pose landmarks, media frames, and game state

pub mod frame;
pub mod game;
pub mod pose;
