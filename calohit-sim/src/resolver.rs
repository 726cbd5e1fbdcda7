//! Cell identifier resolution through the host's numbering schemes.

use calohit_core::geometry::{BaseNumber, EcalNumbering, HcalNumbering};
use calohit_core::hit::CellId;
use calohit_core::step::{Category, Step};
use std::sync::Arc;

/// Numbering collaborators for the three categories.
#[derive(Clone)]
pub struct NumberingSchemes {
    /// Barrel crystal scheme.
    pub eb: Arc<dyn EcalNumbering>,
    /// Endcap crystal scheme.
    pub ee: Arc<dyn EcalNumbering>,
    /// Hadronic scheme.
    pub hc: Arc<dyn HcalNumbering>,
}

impl std::fmt::Debug for NumberingSchemes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NumberingSchemes").finish_non_exhaustive()
    }
}

/// Detector group, layer and depth decoded from hadronic copy numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HcalCopyNumbers {
    /// Detector group (barrel, endcap, ...).
    pub group: i32,
    /// Layer, 1-based.
    pub layer: i32,
    /// Readout depth, 1-based.
    pub depth: i32,
}

impl HcalCopyNumbers {
    /// Decodes `copy0 = layer * 10 + depth` (layer and depth 0-based) and
    /// `copy1 = group * 1000 + ...`.
    #[must_use]
    pub fn decode(copy0: i32, copy1: i32) -> Self {
        Self {
            group: copy1 / 1000,
            layer: (copy0 / 10) % 100 + 1,
            depth: copy0 % 10 + 1,
        }
    }
}

/// Adapter turning a step into a cell identifier.
#[derive(Debug, Clone)]
pub struct CellResolver {
    schemes: NumberingSchemes,
    base: BaseNumber,
}

impl CellResolver {
    /// Creates a resolver over the given schemes.
    #[must_use]
    pub fn new(schemes: NumberingSchemes) -> Self {
        Self {
            schemes,
            base: BaseNumber::with_capacity(8),
        }
    }

    /// Resolves the cell a step of `category` touched.
    ///
    /// The result may be unresolved ([`CellId::is_resolved`] is false);
    /// callers must drop such steps.
    pub fn resolve<S: Step + ?Sized>(&mut self, category: Category, step: &S) -> CellId {
        match category {
            Category::Hc => {
                let copies = HcalCopyNumbers::decode(step.copy_number(0), step.copy_number(1));
                CellId(self.schemes.hc.resolve(
                    copies.group,
                    copies.layer,
                    copies.depth,
                    step.local_position(),
                ))
            }
            Category::Eb | Category::Ee => {
                self.fill_base_number(step);
                let scheme = if category == Category::Eb {
                    &self.schemes.eb
                } else {
                    &self.schemes.ee
                };
                CellId(scheme.unit_id(&self.base))
            }
        }
    }

    fn fill_base_number<S: Step + ?Sized>(&mut self, step: &S) {
        let levels = step.levels();
        self.base.reset();
        self.base.set_size(levels.len());
        // A single level carries no placement information.
        if levels.len() > 1 {
            for level in levels {
                self.base.add_level(level.name.as_str(), level.copy);
            }
        }
    }
}
