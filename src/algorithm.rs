mod astar;

pub use astar::{a_star_search, default_horizon};

use std::collections::HashMap;

use crate::common::{Cell, Path};

// (position, g cost) -> predecessor (position, g cost)
type Trace = HashMap<(Cell, usize), (Cell, usize)>;

fn construct_path(trace: &Trace, mut current: (Cell, usize)) -> Path {
    let mut path = vec![current.0];
    while let Some(&(pos, g_cost)) = trace.get(&current) {
        path.push(pos);
        current = (pos, g_cost);
    }
    path.reverse();
    path
}
