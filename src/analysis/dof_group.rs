//! DOF group - the analysis-side view of one node
//!
//! A group holds the equation number of every DOF of its node. Groups built
//! for constrained nodes also carry a [`Transform`]; their equation numbers are
//! then those of the transformed DOF: the node's own unconstrained DOF followed
//! by the DOF of the retained node.

use serde::{Deserialize, Serialize};

use super::integrator::Integrator;
use super::transformation::Transform;
use crate::domain::{Domain, Node};
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec};
use crate::storage::{Lease, UnbalAndTangent};

/// Equation number of a DOF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Equation {
    /// Not yet numbered
    Pending,
    /// Removed by a constraint, takes no equation
    Constrained,
    Number(usize),
}

/// Gather the entries of a system vector at `id`, unnumbered DOF read as zero
pub(crate) fn gather_equations(
    id: &[Equation],
    x: &FEVec,
    what: impl FnOnce() -> String,
) -> FEAResult<FEVec> {
    if let Some(n) = id.iter().filter_map(Equation::number).find(|&n| n >= x.len()) {
        return Err(FEAError::DofMismatch {
            what: what(),
            expected: n + 1,
            found: x.len(),
        });
    }
    Ok(FEVec::from_iterator(
        id.len(),
        id.iter().map(|e| e.number().map_or(0.0, |n| x[n])),
    ))
}

impl Equation {
    pub fn number(&self) -> Option<usize> {
        match self {
            Equation::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Equation::Pending)
    }
}

/// Where a transformed DOF takes its equation number from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Native DOF of the group's own node
    Own(usize),
    /// DOF of the retained node
    Retained(usize),
}

/// Analysis view of one node
#[derive(Debug, Clone)]
pub struct DofGroup {
    tag: usize,
    node_tag: usize,
    /// Equation numbers of the native DOF
    id: Vec<Equation>,
    transform: Transform,
    columns: Vec<Column>,
    retained_group: Option<usize>,
    /// Equation numbers of the transformed DOF
    mod_id: Vec<Equation>,
    buffers: UnbalAndTangent,
}

impl DofGroup {
    /// Unconstrained group, all DOF pending
    pub fn new(tag: usize, node_tag: usize, ndf: usize, buffers: UnbalAndTangent) -> FEAResult<Self> {
        Self::transformed(
            tag,
            node_tag,
            vec![Equation::Pending; ndf],
            Transform::Identity(ndf),
            (0..ndf).map(Column::Own).collect(),
            None,
            buffers,
        )
    }

    /// Group with an explicit transformation
    ///
    /// `columns` names the source of each transformed DOF and must match the
    /// columns of `transform`; `Column::Retained` entries require `retained_group`.
    pub fn transformed(
        tag: usize,
        node_tag: usize,
        id: Vec<Equation>,
        transform: Transform,
        columns: Vec<Column>,
        retained_group: Option<usize>,
        buffers: UnbalAndTangent,
    ) -> FEAResult<Self> {
        if transform.native_dof() != id.len() {
            return Err(FEAError::DofMismatch {
                what: format!("transformation of DOF group {}", tag),
                expected: id.len(),
                found: transform.native_dof(),
            });
        }
        if transform.transformed_dof() != columns.len() || buffers.size() != columns.len() {
            return Err(FEAError::DofMismatch {
                what: format!("transformed DOF of group {}", tag),
                expected: transform.transformed_dof(),
                found: columns.len(),
            });
        }
        if retained_group.is_none() && columns.iter().any(|c| matches!(c, Column::Retained(_))) {
            return Err(FEAError::Configuration(format!(
                "DOF group {} references a retained node it does not have",
                tag
            )));
        }
        let mod_id = vec![Equation::Pending; columns.len()];
        Ok(Self {
            tag,
            node_tag,
            id,
            transform,
            columns,
            retained_group,
            mod_id,
            buffers,
        })
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn node_tag(&self) -> usize {
        self.node_tag
    }

    pub fn node<'d>(&self, domain: &'d Domain) -> FEAResult<&'d Node> {
        domain.node(self.node_tag).ok_or(FEAError::NodeNotFound(self.node_tag))
    }

    /// Set the equation number of native DOF `dof`
    pub fn set_id(&mut self, dof: usize, value: Equation) -> FEAResult<()> {
        let n = self.id.len();
        let slot = self.id.get_mut(dof).ok_or_else(|| {
            FEAError::InvalidInput(format!("DOF {} out of range for group with {} DOF", dof, n))
        })?;
        *slot = value;
        Ok(())
    }

    /// Replace all native equation numbers
    pub fn set_ids(&mut self, values: &[Equation]) -> FEAResult<()> {
        if values.len() != self.id.len() {
            return Err(FEAError::DofMismatch {
                what: format!("IDs of DOF group {}", self.tag),
                expected: self.id.len(),
                found: values.len(),
            });
        }
        self.id.copy_from_slice(values);
        Ok(())
    }

    /// Equation numbers of the native DOF
    pub fn native_id(&self) -> &[Equation] {
        &self.id
    }

    /// Equation numbers seen by the system of equations
    pub fn id(&self) -> &[Equation] {
        match self.transform {
            Transform::Identity(_) => &self.id,
            Transform::Explicit(_) => &self.mod_id,
        }
    }

    pub(crate) fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn retained_group(&self) -> Option<usize> {
        self.retained_group
    }

    pub(crate) fn set_mod_id(&mut self, mod_id: Vec<Equation>) {
        self.mod_id = mod_id;
    }

    /// Native DOF count
    pub fn num_dof(&self) -> usize {
        self.id.len()
    }

    /// DOF carrying an equation number
    pub fn num_free_dof(&self) -> usize {
        self.id().iter().filter(|e| e.number().is_some()).count()
    }

    /// DOF removed by constraints
    pub fn num_constrained_dof(&self) -> usize {
        self.id.iter().filter(|e| **e == Equation::Constrained).count()
    }

    pub fn get_t(&self) -> &Transform {
        &self.transform
    }

    pub fn get_tangent(&self, domain: &Domain, integrator: &dyn Integrator) -> FEAResult<Lease<'_, Mat>> {
        let mut tang = self.buffers.tangent()?;
        tang.fill(0.0);
        integrator.form_node_tangent(self, domain, &mut tang)?;
        Ok(tang)
    }

    pub fn get_unbalance(&self, domain: &Domain, integrator: &dyn Integrator) -> FEAResult<Lease<'_, FEVec>> {
        let mut unbal = self.buffers.unbalance()?;
        unbal.fill(0.0);
        integrator.form_node_unbalance(self, domain, &mut unbal)?;
        Ok(unbal)
    }

    /// `tang += fact * T^T M T`
    pub fn add_m_to_tang(&self, domain: &Domain, tang: &mut Mat, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        if let Some(mass) = self.node(domain)?.mass() {
            *tang += self.transform.congruence(mass) * fact;
        }
        Ok(())
    }

    /// Nodes carry no damping
    pub fn add_c_to_tang(&self, _domain: &Domain, _tang: &mut Mat, _fact: f64) -> FEAResult<()> {
        Ok(())
    }

    /// `unbal += fact * T^T P`
    pub fn add_p_to_unbalance(&self, domain: &Domain, unbal: &mut FEVec, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        let load = self.node(domain)?.unbalanced_load();
        *unbal += self.transform.reduce(load) * fact;
        Ok(())
    }

    /// `unbal += fact * T^T M a`
    pub fn add_m_accel_to_unbalance(&self, domain: &Domain, unbal: &mut FEVec, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        let node = self.node(domain)?;
        if let Some(mass) = node.mass() {
            *unbal += self.transform.reduce(&(mass * node.trial_accel())) * fact;
        }
        Ok(())
    }

    /// Native values of this node's DOF for a system vector
    fn expand(&self, x: &FEVec) -> FEAResult<FEVec> {
        let gathered = gather_equations(self.id(), x, || {
            format!("system vector at DOF group {}", self.tag)
        })?;
        Ok(self.transform.expand(&gathered))
    }

    /// `fact * T^T M T x` for the system vector `x`
    pub fn get_m_force(&self, domain: &Domain, x: &FEVec, fact: f64) -> FEAResult<FEVec> {
        let node = self.node(domain)?;
        match node.mass() {
            Some(mass) => Ok(self.transform.reduce(&(mass * self.expand(x)?)) * fact),
            None => Ok(FEVec::zeros(self.id().len())),
        }
    }

    pub fn get_committed_disp<'d>(&self, domain: &'d Domain) -> FEAResult<&'d FEVec> {
        Ok(self.node(domain)?.committed_disp())
    }

    pub fn get_committed_vel<'d>(&self, domain: &'d Domain) -> FEAResult<&'d FEVec> {
        Ok(self.node(domain)?.committed_vel())
    }

    pub fn get_committed_accel<'d>(&self, domain: &'d Domain) -> FEAResult<&'d FEVec> {
        Ok(self.node(domain)?.committed_accel())
    }

    pub fn set_node_disp(&self, node: &mut Node, u: &FEVec) -> FEAResult<()> {
        node.set_trial_disp(&self.expand(u)?)
    }

    pub fn set_node_vel(&self, node: &mut Node, v: &FEVec) -> FEAResult<()> {
        node.set_trial_vel(&self.expand(v)?)
    }

    pub fn set_node_accel(&self, node: &mut Node, a: &FEVec) -> FEAResult<()> {
        node.set_trial_accel(&self.expand(a)?)
    }

    pub fn incr_node_disp(&self, node: &mut Node, du: &FEVec) -> FEAResult<()> {
        node.incr_trial_disp(&self.expand(du)?)
    }

    pub fn incr_node_vel(&self, node: &mut Node, dv: &FEVec) -> FEAResult<()> {
        node.incr_trial_vel(&self.expand(dv)?)
    }

    pub fn incr_node_accel(&self, node: &mut Node, da: &FEVec) -> FEAResult<()> {
        node.incr_trial_accel(&self.expand(da)?)
    }

    /// Store mode `mode` (1-based) of the system eigenvector `x` on the node
    pub fn set_eigenvector(&self, node: &mut Node, mode: usize, x: &FEVec) -> FEAResult<()> {
        node.set_eigenvector(mode, &self.expand(x)?)
    }
}
