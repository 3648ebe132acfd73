use braincell_concepts::SetupError;

use serde::{Deserialize, Serialize};

use crate::units::UM_TO_CM;

/// Unbranched cylindrical piece of a neuron.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Section {
    /// Length (µm)
    pub length: f64,
    /// Diameter (µm)
    pub diameter: f64,
    /// Number of compartments this section is split into
    pub n_compartments: usize,
    /// Specific axial resistance (Ω cm)
    pub r_axial: f64,
    /// Specific membrane capacitance (µF/cm²)
    pub c_m: f64,
}

impl Section {
    /// Cylinder of given length (µm) and diameter (µm) with default electrical properties.
    pub fn new(length: f64, diameter: f64, n_compartments: usize) -> Self {
        Self {
            length,
            diameter,
            n_compartments,
            r_axial: 100.0,
            c_m: 1.0,
        }
    }

    /// Electrotonic length constant (µm) for alternating currents of given frequency (Hz).
    ///
    /// \\begin{equation}
    ///     \lambda_f = 10^5\sqrt{\frac{d}{4\pi f r_a c_m}}
    /// \\end{equation}
    pub fn lambda_f(&self, frequency: f64) -> f64 {
        1e5 * (self.diameter / (4.0 * core::f64::consts::PI * frequency * self.r_axial * self.c_m))
            .sqrt()
    }
}

/// Geometry and electrical properties of one compartment of a discretized [Morphology].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CompartmentGeometry {
    /// Index of the section which this compartment belongs to
    pub section: usize,
    /// Length (µm)
    pub length: f64,
    /// Diameter (µm)
    pub diameter: f64,
    /// Lateral surface (µm²)
    pub area: f64,
    /// Specific axial resistance (Ω cm)
    pub r_axial: f64,
    /// Specific membrane capacitance (µF/cm²)
    pub c_m: f64,
    /// Index of the compartment this one is attached to
    pub parent: Option<usize>,
}

impl CompartmentGeometry {
    /// Resistance (Ω) from the center of this compartment to one of its ends.
    pub fn half_resistance(&self) -> f64 {
        let radius = 0.5 * self.diameter * UM_TO_CM;
        self.r_axial * 0.5 * self.length * UM_TO_CM / (core::f64::consts::PI * radius * radius)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
struct NamedSection {
    name: String,
    section: Section,
    parent: Option<(usize, f64)>,
}

/// Tree of [Section]s.
///
/// Exactly one section stays without parent. It is the root of the tree (typically the soma)
/// and its compartments come first when [discretizing](Morphology::compartments), no matter in
/// which order sections were added. Every other section has to be
/// [connected](Morphology::connect) to a parent.
///
/// ```
/// # use braincell_building_blocks::compartments::{Morphology, Section};
/// let mut morphology = Morphology::new();
/// morphology.add_section("soma", Section::new(20.0, 20.0, 1))?;
/// morphology.add_section("dend", Section::new(200.0, 2.0, 5))?;
/// morphology.connect("dend", "soma", 1.0)?;
/// let compartments = morphology.compartments()?;
/// assert_eq!(compartments.len(), 6);
/// assert_eq!(compartments[1].parent, Some(0));
/// # Ok::<(), braincell_concepts::SetupError>(())
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Morphology {
    sections: Vec<NamedSection>,
}

impl Morphology {
    /// Empty morphology
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, name: &str) -> Result<usize, SetupError> {
        self.sections
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SetupError(format!("no section with name {name}")))
    }

    /// Adds a new section and returns its index.
    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        section: Section,
    ) -> Result<usize, SetupError> {
        let name = name.into();
        if self.sections.iter().any(|s| s.name == name) {
            return Err(SetupError(format!("section {name} already exists")));
        }
        if section.n_compartments == 0 {
            return Err(SetupError(format!(
                "section {name} needs at least one compartment"
            )));
        }
        if section.length <= 0.0 || section.diameter <= 0.0 {
            return Err(SetupError(format!(
                "section {name} needs positive length and diameter"
            )));
        }
        self.sections.push(NamedSection {
            name,
            section,
            parent: None,
        });
        Ok(self.sections.len() - 1)
    }

    /// Attaches the child section at the relative `location` $\in[0,1]$ along the parent.
    pub fn connect(&mut self, child: &str, parent: &str, location: f64) -> Result<(), SetupError> {
        if !(0.0..=1.0).contains(&location) {
            return Err(SetupError(format!(
                "location {location} must lie in the interval [0, 1]"
            )));
        }
        let c = self.index_of(child)?;
        let p = self.index_of(parent)?;
        if self.sections[c].parent.is_some() {
            return Err(SetupError(format!("section {child} already has a parent")));
        }
        // Walk upwards from the parent. Reaching the child means a cycle.
        let mut current = Some(p);
        while let Some(i) = current {
            if i == c {
                return Err(SetupError(format!(
                    "connecting {child} to {parent} would create a cycle"
                )));
            }
            current = self.sections[i].parent.map(|(j, _)| j);
        }
        self.sections[c].parent = Some((p, location));
        Ok(())
    }

    /// Names of all sections in the order in which they were added.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Obtains the section with the given name.
    pub fn section(&self, name: &str) -> Result<&Section, SetupError> {
        Ok(&self.sections[self.index_of(name)?].section)
    }

    /// Chooses the number of compartments of every section by the d_lambda rule.
    ///
    /// Every compartment is at most `d_lambda` times the length constant $\lambda_f$ long at the
    /// given frequency (Hz). The result is always odd.
    pub fn set_ncomp_by_d_lambda(
        &mut self,
        frequency: f64,
        d_lambda: f64,
    ) -> Result<(), SetupError> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(SetupError(format!(
                "frequency {frequency} must be positive and finite"
            )));
        }
        if !(d_lambda.is_finite() && d_lambda > 0.0) {
            return Err(SetupError(format!(
                "d_lambda {d_lambda} must be positive and finite"
            )));
        }
        let n_compartments = self
            .sections
            .iter()
            .map(|s| {
                let ratio = s.section.length / (d_lambda * s.section.lambda_f(frequency));
                let half = ((ratio + 0.9) / 2.0).floor();
                if half.is_finite() && half < (u32::MAX / 2) as f64 {
                    Ok(2 * half as usize + 1)
                } else {
                    Err(SetupError(format!(
                        "section {} would need too many compartments",
                        s.name
                    )))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (s, n) in self.sections.iter_mut().zip(n_compartments) {
            s.section.n_compartments = n;
        }
        Ok(())
    }

    /// Sections in depth-first order starting at the root.
    ///
    /// Children are visited in the order in which they were added.
    fn ordered_sections(&self) -> Result<Vec<usize>, SetupError> {
        let roots: Vec<_> = (0..self.sections.len())
            .filter(|&i| self.sections[i].parent.is_none())
            .collect();
        if roots.len() != 1 {
            return Err(SetupError(format!(
                "morphology needs exactly one root section but found {}",
                roots.len()
            )));
        }
        let mut order = Vec::with_capacity(self.sections.len());
        let mut stack = roots;
        while let Some(index) = stack.pop() {
            order.push(index);
            // Reversed so that the first added child is popped first
            stack.extend(
                (0..self.sections.len())
                    .rev()
                    .filter(|&c| self.sections[c].parent.map(|(p, _)| p) == Some(index)),
            );
        }
        Ok(order)
    }

    /// Splits every section into its compartments.
    ///
    /// Sections are numbered depth-first from the root, so compartment 0 always belongs to the
    /// root section. Within a section, the first compartment lies closest to the parent.
    pub fn compartments(&self) -> Result<Vec<CompartmentGeometry>, SetupError> {
        let order = self.ordered_sections()?;
        let mut offsets = vec![0; self.sections.len()];
        let mut n_total = 0;
        for &index in order.iter() {
            offsets[index] = n_total;
            n_total += self.sections[index].section.n_compartments;
        }
        let mut compartments = Vec::with_capacity(n_total);
        for &index in order.iter() {
            let s = &self.sections[index];
            let n = s.section.n_compartments;
            let length = s.section.length / n as f64;
            for k in 0..n {
                let parent = if k > 0 {
                    Some(offsets[index] + k - 1)
                } else {
                    s.parent.map(|(p, location)| {
                        let n_parent = self.sections[p].section.n_compartments;
                        let local = ((location * n_parent as f64).floor() as usize).min(n_parent - 1);
                        offsets[p] + local
                    })
                };
                compartments.push(CompartmentGeometry {
                    section: index,
                    length,
                    diameter: s.section.diameter,
                    area: core::f64::consts::PI * s.section.diameter * length,
                    r_axial: s.section.r_axial,
                    c_m: s.section.c_m,
                    parent,
                });
            }
        }
        Ok(compartments)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reject_invalid_sections() {
        let mut morphology = Morphology::new();
        assert!(morphology
            .add_section("soma", Section::new(10.0, 10.0, 0))
            .is_err());
        morphology
            .add_section("soma", Section::new(10.0, 10.0, 1))
            .unwrap();
        assert!(morphology
            .add_section("soma", Section::new(10.0, 10.0, 1))
            .is_err());
    }

    #[test]
    fn reject_cycles_and_second_parents() -> Result<(), SetupError> {
        let mut morphology = Morphology::new();
        morphology.add_section("a", Section::new(10.0, 1.0, 1))?;
        morphology.add_section("b", Section::new(10.0, 1.0, 1))?;
        morphology.add_section("c", Section::new(10.0, 1.0, 1))?;
        morphology.connect("b", "a", 1.0)?;
        morphology.connect("c", "b", 0.5)?;
        assert!(morphology.connect("a", "c", 1.0).is_err());
        assert!(morphology.connect("c", "a", 1.0).is_err());
        assert!(morphology.connect("a", "a", 1.0).is_err());
        assert!(morphology.connect("x", "a", 1.0).is_err());
        assert!(morphology.connect("a", "b", 1.5).is_err());
        Ok(())
    }

    #[test]
    fn unconnected_sections_cannot_be_discretized() -> Result<(), SetupError> {
        let mut morphology = Morphology::new();
        morphology.add_section("a", Section::new(10.0, 1.0, 1))?;
        morphology.add_section("b", Section::new(10.0, 1.0, 1))?;
        assert!(morphology.compartments().is_err());
        Ok(())
    }

    #[test]
    fn branch_attaches_at_location() -> Result<(), SetupError> {
        let mut morphology = Morphology::new();
        morphology.add_section("soma", Section::new(20.0, 20.0, 1))?;
        morphology.add_section("axon", Section::new(100.0, 1.0, 4))?;
        morphology.add_section("branch", Section::new(50.0, 0.5, 2))?;
        morphology.connect("axon", "soma", 0.0)?;
        morphology.connect("branch", "axon", 0.6)?;
        let compartments = morphology.compartments()?;
        assert_eq!(compartments.len(), 7);
        assert_eq!(compartments[0].parent, None);
        assert_eq!(compartments[1].parent, Some(0));
        assert_eq!(compartments[4].parent, Some(3));
        // floor(0.6 * 4) = 2 -> third compartment of the axon
        assert_eq!(compartments[5].parent, Some(3));
        assert_eq!(compartments[6].parent, Some(5));
        approx::assert_abs_diff_eq!(compartments[1].length, 25.0);
        approx::assert_abs_diff_eq!(compartments[1].area, core::f64::consts::PI * 25.0);
        Ok(())
    }

    #[test]
    fn d_lambda_gives_odd_counts() -> Result<(), SetupError> {
        let mut morphology = Morphology::new();
        morphology.add_section("soma", Section::new(20.0, 20.0, 4))?;
        morphology.add_section("dend", Section::new(1000.0, 1.0, 1))?;
        morphology.add_section("tiny", Section::new(1.0, 1.0, 8))?;
        morphology.set_ncomp_by_d_lambda(100.0, 0.1)?;
        for name in ["soma", "dend", "tiny"] {
            let n = morphology.section(name)?.n_compartments;
            assert!(n >= 1);
            assert_eq!(n % 2, 1);
        }
        assert_eq!(morphology.section("tiny")?.n_compartments, 1);
        // lambda_f = 1e5 * sqrt(1/(4 pi 100 100 1)) = 282.1 µm
        let lambda = morphology.section("dend")?.lambda_f(100.0);
        approx::assert_abs_diff_eq!(lambda, 282.09, epsilon = 0.01);
        // floor((1000/28.209 + 0.9)/2)*2 + 1 = 37
        assert_eq!(morphology.section("dend")?.n_compartments, 37);
        Ok(())
    }

    #[test]
    fn d_lambda_rejects_invalid_parameters() -> Result<(), SetupError> {
        let mut morphology = Morphology::new();
        morphology.add_section("soma", Section::new(20.0, 20.0, 3))?;
        assert!(morphology.set_ncomp_by_d_lambda(100.0, 0.0).is_err());
        assert!(morphology.set_ncomp_by_d_lambda(100.0, -0.1).is_err());
        assert!(morphology.set_ncomp_by_d_lambda(0.0, 0.1).is_err());
        assert!(morphology.set_ncomp_by_d_lambda(f64::NAN, 0.1).is_err());
        assert!(morphology.set_ncomp_by_d_lambda(100.0, f64::INFINITY).is_err());
        assert!(morphology.set_ncomp_by_d_lambda(100.0, 1e-300).is_err());
        // Failed calls leave the sections untouched
        assert_eq!(morphology.section("soma")?.n_compartments, 3);
        Ok(())
    }

    #[test]
    fn root_compartments_come_first() -> Result<(), SetupError> {
        let mut morphology = Morphology::new();
        morphology.add_section("dend", Section::new(300.0, 2.0, 3))?;
        morphology.add_section("axon", Section::new(100.0, 1.0, 2))?;
        morphology.add_section("soma", Section::new(20.0, 20.0, 1))?;
        morphology.connect("dend", "soma", 1.0)?;
        morphology.connect("axon", "soma", 0.0)?;
        let compartments = morphology.compartments()?;
        assert_eq!(compartments.len(), 6);
        // soma, then dend and axon in the order they were added
        let sections: Vec<_> = compartments.iter().map(|c| c.section).collect();
        assert_eq!(sections, vec![2, 0, 0, 0, 1, 1]);
        let parents: Vec<_> = compartments.iter().map(|c| c.parent).collect();
        assert_eq!(
            parents,
            vec![None, Some(0), Some(1), Some(2), Some(0), Some(4)]
        );
        Ok(())
    }
}
