//! Leaf placement and aging.
//!
//! Leaves live or die by the hydration automaton and by light. Aging is
//! driven by an outside scheduler, one position at a time.

use rand::Rng;

use crate::cells::solve_hydration;
use crate::grid::{read_occupant, Grid, Occupant};
use crate::species::LeavesProperties;
use crate::types::{offset, Direction, GridPos};

/// A leaf is at the bottom of its column unless a leaf, a root, or a twig of
/// the leaves' family sits directly beneath it. Thick branches, other
/// families and non-tree cells count as ground.
pub fn is_bottom<G: Grid + ?Sized>(grid: &G, leaves: &LeavesProperties, pos: GridPos) -> bool {
    let family = leaves.family();
    match read_occupant(&*grid, offset(pos, Direction::Down)) {
        Occupant::Branch {
            family: below,
            radius,
        } => below != family.id || radius != family.primary_thickness,
        Occupant::Leaves { .. } | Occupant::Root { .. } => false,
        _ => true,
    }
}

/// Whether `pos` gets enough light to hold leaves of this type.
pub fn has_adequate_light<G: Grid + ?Sized>(
    grid: &G,
    leaves: &LeavesProperties,
    pos: GridPos,
) -> bool {
    if grid.can_see_sky(pos) {
        return true;
    }

    let light = leaves.light();
    if light.smother_max != 0 && is_bottom(grid, leaves, pos) {
        let mut above = pos;
        let mut smothering = 0;
        for _ in 0..light.smother_max {
            above = offset(above, Direction::Up);
            if read_occupant(&*grid, above).is_tree_part() {
                smothering += 1;
            }
        }
        if smothering >= light.smother_max {
            return false;
        }
    }

    let existing = matches!(read_occupant(&*grid, pos), Occupant::Leaves { .. });
    grid.sky_light(pos) >= light.minimum(existing)
}

/// Empty, lit, and not resting on solid ground or liquid.
pub fn is_location_suitable_for_new_leaves<G: Grid + ?Sized>(
    grid: &G,
    leaves: &LeavesProperties,
    pos: GridPos,
) -> bool {
    if !grid.is_accessible(pos) || !read_occupant(&*grid, pos).is_air() {
        return false;
    }
    match read_occupant(&*grid, offset(pos, Direction::Down)) {
        Occupant::Solid | Occupant::Liquid => return false,
        _ => {}
    }
    has_adequate_light(grid, leaves, pos)
}

/// Places leaves at `pos` if the location allows it. A `hydration` of 0
/// means the kit's default.
pub fn grow_leaves_if_suitable<G: Grid + ?Sized>(
    grid: &mut G,
    leaves: &LeavesProperties,
    pos: GridPos,
    hydration: u8,
) -> bool {
    let hydration = if hydration == 0 {
        leaves.cell_kit().default_hydration()
    } else {
        hydration
    };
    if is_location_suitable_for_new_leaves(grid, leaves, pos) {
        grid.set_occupant(
            pos,
            Occupant::Leaves {
                leaves: leaves.id(),
                hydration,
            },
        );
        return true;
    }
    false
}

/// Ensures leaves of this type occupy `pos`, growing them into air when
/// possible. Returns whether they are there afterwards.
pub fn need_leaves<G: Grid + ?Sized>(grid: &mut G, leaves: &LeavesProperties, pos: GridPos) -> bool {
    match read_occupant(&*grid, pos) {
        Occupant::Air => grow_leaves_if_suitable(grid, leaves, pos, 0),
        occupant => occupant.is_leaves_of(leaves.id()),
    }
}

/// Ages the leaves at `pos`.
///
/// Returns the new hydration, or `None` if the leaves died (or there were
/// no leaves of this type to age). Surviving leaves try to spread into each
/// neighboring cell; poorly hydrated ones only with a 1 in 4 chance per side.
/// During world generation light is ignored, as it is not settled yet.
pub fn age_leaves<G: Grid + ?Sized>(
    grid: &mut G,
    leaves: &LeavesProperties,
    pos: GridPos,
    rng: &mut impl Rng,
    world_gen: bool,
) -> Option<u8> {
    let old = match read_occupant(&*grid, pos) {
        Occupant::Leaves {
            leaves: id,
            hydration,
        } if id == leaves.id() => hydration,
        _ => return None,
    };

    let new = solve_hydration(grid, pos, leaves);
    if new == 0 || (!world_gen && !has_adequate_light(grid, leaves, pos)) {
        grid.clear_occupant(pos);
        tracing::trace!(?pos, "leaves dried out");
        return None;
    }
    if new != old {
        grid.set_occupant(
            pos,
            Occupant::Leaves {
                leaves: leaves.id(),
                hydration: new,
            },
        );
    }

    for dir in Direction::ALL {
        if new > 1 || rng.random_range(0..4) == 0 {
            let next = offset(pos, dir);
            if is_location_suitable_for_new_leaves(grid, leaves, next) {
                let hydration = solve_hydration(grid, next, leaves);
                if hydration > 0 {
                    grid.set_occupant(
                        next,
                        Occupant::Leaves {
                            leaves: leaves.id(),
                            hydration,
                        },
                    );
                }
            }
        }
    }

    Some(new)
}
