pub mod prelude;

pub mod game_genres;
pub mod game_platforms;
pub mod games;
pub mod genres;
pub mod platforms;
pub mod publishers;
