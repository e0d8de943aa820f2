//! FE element - the analysis-side view of one domain element
//!
//! Element matrices come in native DOF and are mapped through the
//! transformations of the element's DOF groups before they reach the system
//! of equations. Elements whose groups are all unconstrained take the exact
//! native matrices.

use super::dof_group::{gather_equations, DofGroup, Equation};
use super::integrator::Integrator;
use super::transformation::{expand_vector, transform_residual, transform_tangent, Transform};
use crate::domain::Domain;
use crate::elements::Element;
use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec};
use crate::storage::{Lease, UnbalAndTangent};

#[derive(Debug, Clone)]
pub struct FeElement {
    tag: usize,
    element_tag: usize,
    /// DOF group tags, in the element's node order
    groups: Vec<usize>,
    native_dof: usize,
    id: Vec<Equation>,
    transforms: Vec<Transform>,
    buffers: UnbalAndTangent,
}

impl FeElement {
    pub fn new(
        tag: usize,
        element_tag: usize,
        groups: Vec<usize>,
        native_dof: usize,
        buffers: UnbalAndTangent,
    ) -> Self {
        Self {
            tag,
            element_tag,
            groups,
            native_dof,
            id: Vec::new(),
            transforms: Vec::new(),
            buffers,
        }
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn element_tag(&self) -> usize {
        self.element_tag
    }

    pub fn dof_groups(&self) -> &[usize] {
        &self.groups
    }

    pub fn element<'d>(&self, domain: &'d Domain) -> FEAResult<&'d dyn Element> {
        domain
            .element(self.element_tag)
            .ok_or(FEAError::ElementNotFound(self.element_tag))
    }

    /// Concatenate the equation numbers of the element's DOF groups.
    ///
    /// Returns the number of transformed DOF.
    pub fn set_id(&mut self, groups: &[&DofGroup]) -> FEAResult<usize> {
        let tags: Vec<usize> = groups.iter().map(|g| g.tag()).collect();
        if tags != self.groups {
            return Err(FEAError::Configuration(format!(
                "FE element {} expects DOF groups {:?}, got {:?}",
                self.tag, self.groups, tags
            )));
        }
        let found: usize = groups.iter().map(|g| g.num_dof()).sum();
        if found != self.native_dof {
            return Err(FEAError::DofMismatch {
                what: format!("element {}", self.element_tag),
                expected: self.native_dof,
                found,
            });
        }
        self.id = groups.iter().flat_map(|g| g.id().iter().copied()).collect();
        self.transforms = groups.iter().map(|g| g.get_t().clone()).collect();
        Ok(self.id.len())
    }

    pub fn id(&self) -> &[Equation] {
        &self.id
    }

    /// DOF count seen by the system of equations
    pub fn num_dof(&self) -> usize {
        self.id.len()
    }

    pub fn is_transformed(&self) -> bool {
        !self.transforms.iter().all(Transform::is_identity)
    }

    pub(crate) fn buffer_size(&self) -> usize {
        self.buffers.size()
    }

    pub(crate) fn set_buffers(&mut self, buffers: UnbalAndTangent) {
        self.buffers = buffers;
    }

    fn check_ready(&self) -> FEAResult<()> {
        if self.transforms.is_empty() || self.buffers.size() != self.id.len() {
            return Err(FEAError::Configuration(format!(
                "FE element {} used before its IDs were set",
                self.tag
            )));
        }
        Ok(())
    }

    pub fn get_tangent(&self, domain: &Domain, integrator: &dyn Integrator) -> FEAResult<Lease<'_, Mat>> {
        self.check_ready()?;
        let mut tang = self.buffers.tangent()?;
        tang.fill(0.0);
        integrator.form_ele_tangent(self, domain, &mut tang)?;
        Ok(tang)
    }

    pub fn get_residual(&self, domain: &Domain, integrator: &dyn Integrator) -> FEAResult<Lease<'_, FEVec>> {
        self.check_ready()?;
        let mut resid = self.buffers.unbalance()?;
        resid.fill(0.0);
        integrator.form_ele_residual(self, domain, &mut resid)?;
        Ok(resid)
    }

    fn add_native(&self, tang: &mut Mat, k: &Mat, fact: f64) -> FEAResult<()> {
        let kt = transform_tangent(k, &self.transforms)?;
        if kt.shape() != tang.shape() {
            return Err(FEAError::DofMismatch {
                what: format!("tangent of FE element {}", self.tag),
                expected: tang.nrows(),
                found: kt.nrows(),
            });
        }
        *tang += kt * fact;
        Ok(())
    }

    pub fn add_kt_to_tang(&self, domain: &Domain, tang: &mut Mat, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        self.add_native(tang, &self.element(domain)?.tangent_stiff()?, fact)
    }

    pub fn add_ki_to_tang(&self, domain: &Domain, tang: &mut Mat, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        self.add_native(tang, &self.element(domain)?.initial_stiff()?, fact)
    }

    pub fn add_c_to_tang(&self, domain: &Domain, tang: &mut Mat, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        self.add_native(tang, &self.element(domain)?.damp()?, fact)
    }

    pub fn add_m_to_tang(&self, domain: &Domain, tang: &mut Mat, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        self.add_native(tang, &self.element(domain)?.mass()?, fact)
    }

    /// `resid -= fact * T^T R`
    pub fn add_r_to_residual(&self, domain: &Domain, resid: &mut FEVec, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        let r = self.element(domain)?.resisting_force()?;
        resid.axpy(-fact, &transform_residual(&r, &self.transforms)?, 1.0);
        Ok(())
    }

    /// `resid -= fact * T^T (R + C v + M a)`
    pub fn add_r_inc_inertia_to_residual(&self, domain: &Domain, resid: &mut FEVec, fact: f64) -> FEAResult<()> {
        if fact == 0.0 {
            return Ok(());
        }
        let element = self.element(domain)?;
        let nodes = domain.element_nodes(element)?;
        let r = element.resisting_force_inc_inertia(&nodes)?;
        resid.axpy(-fact, &transform_residual(&r, &self.transforms)?, 1.0);
        Ok(())
    }

    /// Native element values of a system vector; unnumbered DOF read as zero
    fn expand(&self, x: &FEVec) -> FEAResult<FEVec> {
        let gathered = gather_equations(&self.id, x, || {
            format!("system vector at FE element {}", self.tag)
        })?;
        expand_vector(&gathered, &self.transforms)
    }

    fn matrix_force(&self, m: &Mat, x: &FEVec, fact: f64) -> FEAResult<FEVec> {
        self.check_ready()?;
        let f = m * self.expand(x)? * fact;
        transform_residual(&f, &self.transforms)
    }

    /// `fact * T^T K T x` for the system vector `x`
    pub fn get_k_force(&self, domain: &Domain, x: &FEVec, fact: f64) -> FEAResult<FEVec> {
        self.matrix_force(&self.element(domain)?.tangent_stiff()?, x, fact)
    }

    pub fn get_c_force(&self, domain: &Domain, x: &FEVec, fact: f64) -> FEAResult<FEVec> {
        self.matrix_force(&self.element(domain)?.damp()?, x, fact)
    }

    pub fn get_m_force(&self, domain: &Domain, x: &FEVec, fact: f64) -> FEAResult<FEVec> {
        self.matrix_force(&self.element(domain)?.mass()?, x, fact)
    }

    pub fn update(&self, domain: &mut Domain) -> FEAResult<()> {
        domain.update_element(self.element_tag)
    }

    pub fn commit_state(&self, domain: &mut Domain) -> FEAResult<()> {
        domain.commit_element(self.element_tag)
    }
}
