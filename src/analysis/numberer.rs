use log::info;

use super::dof_group::Equation;
use super::model::AnalysisModel;
use crate::error::FEAResult;

/// Numbers the pending DOF of every group in group insertion order, then
/// completes the transformed and FE element IDs
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainNumberer;

impl PlainNumberer {
    /// Returns the number of equations
    pub fn number(&self, model: &mut AnalysisModel) -> FEAResult<usize> {
        let mut next = 0;
        for group in model.dof_groups_mut() {
            for dof in 0..group.num_dof() {
                if group.native_id()[dof].is_pending() {
                    group.set_id(dof, Equation::Number(next))?;
                    next += 1;
                }
            }
        }
        model.set_num_eqn(next);
        model.finalize_ids()?;
        info!("numbered {} equations", next);
        Ok(next)
    }
}
