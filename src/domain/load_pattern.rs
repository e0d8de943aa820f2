//! Load patterns - nodal loads scaled by a time series

use serde::{Deserialize, Serialize};

use crate::math::Vec as FEVec;

/// Load factor as a function of pseudo-time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeSeries {
    /// `factor` at every time
    Constant { factor: f64 },
    /// `factor * t`
    Linear { factor: f64 },
}

impl TimeSeries {
    pub fn factor(&self, time: f64) -> f64 {
        match *self {
            TimeSeries::Constant { factor } => factor,
            TimeSeries::Linear { factor } => factor * time,
        }
    }
}

impl Default for TimeSeries {
    fn default() -> Self {
        TimeSeries::Linear { factor: 1.0 }
    }
}

/// A load applied directly to a node, one component per DOF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodalLoad {
    pub node: usize,
    pub values: Vec<f64>,
}

impl NodalLoad {
    pub fn new(node: usize, values: &[f64]) -> Self {
        Self {
            node,
            values: values.to_vec(),
        }
    }

    /// Load as a vector scaled by a factor
    pub fn scaled(&self, factor: f64) -> FEVec {
        FEVec::from_iterator(self.values.len(), self.values.iter().map(|v| v * factor))
    }
}

/// A load pattern groups nodal loads under a common time series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadPattern {
    tag: usize,
    series: TimeSeries,
    loads: Vec<NodalLoad>,
}

impl LoadPattern {
    pub fn new(tag: usize, series: TimeSeries) -> Self {
        Self {
            tag,
            series,
            loads: Vec::new(),
        }
    }

    /// Pattern with a constant factor of one
    pub fn constant(tag: usize) -> Self {
        Self::new(tag, TimeSeries::Constant { factor: 1.0 })
    }

    pub fn with_nodal_load(mut self, load: NodalLoad) -> Self {
        self.loads.push(load);
        self
    }

    pub fn add_nodal_load(&mut self, load: NodalLoad) {
        self.loads.push(load);
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn load_factor(&self, time: f64) -> f64 {
        self.series.factor(time)
    }

    pub fn nodal_loads(&self) -> &[NodalLoad] {
        &self.loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_series() {
        assert_eq!(TimeSeries::Constant { factor: 2.0 }.factor(7.0), 2.0);
        assert_eq!(TimeSeries::Linear { factor: 2.0 }.factor(0.5), 1.0);
    }

    #[test]
    fn test_pattern_loads() {
        let pattern = LoadPattern::constant(1).with_nodal_load(NodalLoad::new(2, &[0.0, -10.0]));
        assert_eq!(pattern.nodal_loads().len(), 1);
        assert_eq!(pattern.nodal_loads()[0].scaled(0.5)[1], -5.0);
        assert_eq!(pattern.load_factor(3.0), 1.0);
    }
}
