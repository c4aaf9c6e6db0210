use std::path::{Path, PathBuf};

use log::trace;
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::environment::{Environment, StepInfo, StepResult};
use crate::error::{Error, Result};

const CELL_PIXELS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Tree,
    Fire,
}

impl Cell {
    fn value(self) -> f32 {
        match self {
            Cell::Empty => 0.0,
            Cell::Tree => 1.0,
            Cell::Fire => -1.0,
        }
    }

    fn color(self) -> RGBColor {
        match self {
            Cell::Empty => RGBColor(101, 67, 33),
            Cell::Tree => RGBColor(34, 139, 34),
            Cell::Fire => RGBColor(255, 69, 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForestFireConfig {
    pub width: usize,
    pub height: usize,
    /// Probability that a cell holds a tree after reset
    pub tree_density: f32,
    /// Probability that an empty cell grows a tree in one step
    pub p_growth: f32,
    /// Probability that a tree is struck by lightning in one step
    pub p_lightning: f32,
    /// Chebyshev radius of the area cleared by one action
    pub action_radius: usize,
    pub max_episode_steps: usize,
    /// Observe the grid as a `[1, H, W]` image instead of a flat vector
    pub image_obs: bool,
}

impl Default for ForestFireConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            tree_density: 0.55,
            p_growth: 0.001,
            p_lightning: 0.00001,
            action_radius: 2,
            max_episode_steps: 1000,
            image_obs: true,
        }
    }
}

/// Forest-fire cellular automaton (Drossel–Schwabl) with a firefighting agent.
///
/// Each step the agent picks a point `[x, y]` in `[-1, 1]²`; every burning cell
/// within `action_radius` of the matching grid cell is put out. The forest
/// then evolves one generation:
///
/// - a burning cell burns out and becomes empty
/// - a tree next to a burning cell (4-neighbourhood) catches fire
/// - a tree is ignited by lightning with probability `p_lightning`
/// - an empty cell grows a tree with probability `p_growth`
///
/// The reward is minus the number of burning cells, measured in units of the
/// area one action can clear. The episode ends once the fire is out or the
/// time limit is reached.
pub struct ForestFire {
    config: ForestFireConfig,
    grid: Vec<Cell>,
    steps: usize,
    frame: usize,
    rng: StdRng,
    render_dir: Option<PathBuf>,
}

impl ForestFire {
    pub fn new(config: ForestFireConfig) -> Self {
        let cells = config.width * config.height;
        Self {
            config,
            grid: vec![Cell::Empty; cells],
            steps: 0,
            frame: 0,
            rng: StdRng::from_os_rng(),
            render_dir: None,
        }
    }

    pub fn with_render_dir(mut self, dir: Option<&Path>) -> Self {
        self.render_dir = dir.map(Path::to_path_buf);
        self
    }

    pub fn config(&self) -> &ForestFireConfig {
        &self.config
    }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.grid[self.index(x, y)]
    }

    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        let idx = self.index(x, y);
        self.grid[idx] = cell;
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(
            x < self.config.width && y < self.config.height,
            "cell ({x}, {y}) outside {}x{} grid",
            self.config.width,
            self.config.height
        );
        y * self.config.width + x
    }

    /// Replaces every cell, e.g. to set up a scenario by hand.
    pub fn fill(&mut self, cell: Cell) {
        self.grid.iter_mut().for_each(|c| *c = cell);
    }

    pub fn tree_count(&self) -> usize {
        self.count(Cell::Tree)
    }

    pub fn fire_count(&self) -> usize {
        self.count(Cell::Fire)
    }

    fn count(&self, kind: Cell) -> usize {
        self.grid.iter().filter(|&&c| c == kind).count()
    }

    fn action_area(&self) -> f32 {
        let side = 2 * self.config.action_radius + 1;
        (side * side) as f32
    }

    /// Maps an action in `[-1, 1]²` to grid coordinates.
    fn target_cell(&self, action: &[f32]) -> (usize, usize) {
        let scale = |a: f32, len: usize| {
            let unit = (a.clamp(-1.0, 1.0) + 1.0) / 2.0;
            (unit * (len - 1) as f32).round() as usize
        };
        let ax = action.first().copied().unwrap_or(0.0);
        let ay = action.get(1).copied().unwrap_or(0.0);
        (scale(ax, self.config.width), scale(ay, self.config.height))
    }

    fn extinguish(&mut self, cx: usize, cy: usize) {
        let r = self.config.action_radius;
        let x_range = cx.saturating_sub(r)..=(cx + r).min(self.config.width - 1);
        for y in cy.saturating_sub(r)..=(cy + r).min(self.config.height - 1) {
            for x in x_range.clone() {
                if self.cell(x, y) == Cell::Fire {
                    self.set_cell(x, y, Cell::Empty);
                }
            }
        }
    }

    fn has_burning_neighbour(&self, x: usize, y: usize) -> bool {
        let (w, h) = (self.config.width, self.config.height);
        (x > 0 && self.cell(x - 1, y) == Cell::Fire)
            || (x + 1 < w && self.cell(x + 1, y) == Cell::Fire)
            || (y > 0 && self.cell(x, y - 1) == Cell::Fire)
            || (y + 1 < h && self.cell(x, y + 1) == Cell::Fire)
    }

    fn evolve(&mut self) {
        let mut next = self.grid.clone();
        for y in 0..self.config.height {
            for x in 0..self.config.width {
                let idx = y * self.config.width + x;
                next[idx] = match self.grid[idx] {
                    Cell::Fire => Cell::Empty,
                    Cell::Tree => {
                        if self.has_burning_neighbour(x, y)
                            || self.rng.random::<f32>() < self.config.p_lightning
                        {
                            Cell::Fire
                        } else {
                            Cell::Tree
                        }
                    }
                    Cell::Empty => {
                        if self.rng.random::<f32>() < self.config.p_growth {
                            Cell::Tree
                        } else {
                            Cell::Empty
                        }
                    }
                };
            }
        }
        self.grid = next;
    }

    fn observation(&self) -> Vec<f32> {
        self.grid.iter().map(|c| c.value()).collect()
    }

    fn draw_frame(&self, path: &Path) -> Result<()> {
        let size = (
            self.config.width as u32 * CELL_PIXELS,
            self.config.height as u32 * CELL_PIXELS,
        );
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| Error::Plot(e.to_string()))?;

        for y in 0..self.config.height {
            for x in 0..self.config.width {
                let x0 = (x as u32 * CELL_PIXELS) as i32;
                let y0 = (y as u32 * CELL_PIXELS) as i32;
                let x1 = x0 + CELL_PIXELS as i32;
                let y1 = y0 + CELL_PIXELS as i32;
                root.draw(&Rectangle::new(
                    [(x0, y0), (x1, y1)],
                    self.cell(x, y).color().filled(),
                ))
                .map_err(|e| Error::Plot(e.to_string()))?;
            }
        }

        root.present().map_err(|e| Error::Plot(e.to_string()))?;
        Ok(())
    }
}

impl Environment for ForestFire {
    fn reset(&mut self) -> Vec<f32> {
        self.steps = 0;
        let density = self.config.tree_density;
        for i in 0..self.grid.len() {
            self.grid[i] = if self.rng.random::<f32>() < density {
                Cell::Tree
            } else {
                Cell::Empty
            };
        }

        // 随机点燃一棵树
        let trees: Vec<usize> = (0..self.grid.len())
            .filter(|&i| self.grid[i] == Cell::Tree)
            .collect();
        let ignite = if trees.is_empty() {
            self.rng.random_range(0..self.grid.len())
        } else {
            trees[self.rng.random_range(0..trees.len())]
        };
        self.grid[ignite] = Cell::Fire;

        self.observation()
    }

    fn step(&mut self, action: &[f32]) -> StepResult {
        let (cx, cy) = self.target_cell(action);
        self.extinguish(cx, cy);
        self.evolve();
        self.steps += 1;

        let fires = self.fire_count();
        let reward = -(fires as f32) / self.action_area();
        let done = fires == 0 || self.steps >= self.config.max_episode_steps;

        StepResult {
            next_state: self.observation(),
            reward,
            done,
            info: StepInfo {
                tree_count: Some(self.tree_count()),
            },
        }
    }

    fn sample_action(&mut self) -> Vec<f32> {
        (0..2).map(|_| self.rng.random_range(-1.0..=1.0)).collect()
    }

    fn observation_shape(&self) -> Vec<usize> {
        if self.config.image_obs {
            vec![1, self.config.height, self.config.width]
        } else {
            vec![self.config.height * self.config.width]
        }
    }

    fn action_dim(&self) -> usize {
        2
    }

    fn action_high(&self) -> f32 {
        1.0
    }

    fn max_episode_steps(&self) -> usize {
        self.config.max_episode_steps
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn render(&mut self, step: usize) -> Result<()> {
        let Some(dir) = self.render_dir.clone() else {
            trace!("render({step}) skipped, no render directory");
            return Ok(());
        };
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("forest_{step:05}_{:05}.png", self.frame));
        self.frame += 1;
        self.draw_frame(&path)
    }
}
