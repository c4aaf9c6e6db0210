pub mod forest_fire;
pub mod pendulum;

use std::path::Path;

pub use forest_fire::{Cell, ForestFire, ForestFireConfig};
pub use pendulum::Pendulum;

use crate::environment::Environment;
use crate::error::{Error, Result};

/// Builds an environment from its registered id.
///
/// Forest-fire frames are written to `render_dir` when one is given.
pub fn make(id: &str, render_dir: Option<&Path>) -> Result<Box<dyn Environment>> {
    match id {
        "ForestFire-v0" | "gym_forestfire:ForestFire-v0" => Ok(Box::new(
            ForestFire::new(ForestFireConfig::default()).with_render_dir(render_dir),
        )),
        "ForestFire-flat-v0" | "gym_forestfire:ForestFire-flat-v0" => {
            let config = ForestFireConfig {
                width: 16,
                height: 16,
                action_radius: 1,
                image_obs: false,
                ..Default::default()
            };
            Ok(Box::new(ForestFire::new(config).with_render_dir(render_dir)))
        }
        "Pendulum-v1" => Ok(Box::new(Pendulum::default())),
        other => Err(Error::UnknownEnvironment(other.to_string())),
    }
}
