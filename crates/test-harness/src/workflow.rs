//! ModelBuilder: fluent API for scripting modelling sessions in tests.
//!
//! Calls the real `Brep` constructors and booleans against a chosen kernel.
//! All methods take string names instead of shape handles for readability.

use brep::{Brep, BrepError};
use brep_kernel::{Kernel, MockKernel, Tolerance, TruckKernel};
use brep_types::{Cuboid, Cylinder, Frame, Mesh, Plane, Point, Polygon, Sphere, Transformation, Vector};
use file_format::{ProjectMetadata, StlOptions};

use crate::helpers::*;
use crate::oracle;

/// A fluent builder for constructing and verifying shapes in tests.
///
/// Holds an ordered list of named bodies and the kernel that booleans and
/// fillets run on. Failed operations are recorded by name and returned.
pub struct ModelBuilder {
    pub(crate) kernel: Box<dyn Kernel>,
    pub(crate) bodies: Vec<(String, Brep)>,
    redo_stack: Vec<(String, Brep)>,
    errors: Vec<(String, String)>,
    history: Vec<(String, String)>,
    auto_check: bool,
    tolerance: f64,
}

fn find<'a>(bodies: &'a [(String, Brep)], name: &str) -> Result<&'a Brep, HarnessError> {
    bodies
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, b)| b)
        .ok_or_else(|| HarnessError::BodyNotFound {
            name: name.to_string(),
        })
}

fn frame_at(origin: [f64; 3]) -> Frame {
    Frame {
        point: Point::new(origin[0], origin[1], origin[2]),
        ..Frame::worldxy()
    }
}

impl ModelBuilder {
    fn with_kernel(kernel: Box<dyn Kernel>) -> Self {
        Self {
            kernel,
            bodies: Vec::new(),
            redo_stack: Vec::new(),
            errors: Vec::new(),
            history: Vec::new(),
            auto_check: false,
            tolerance: Tolerance::default().sewing,
        }
    }

    /// Create a new ModelBuilder with MockKernel (deterministic, fast).
    pub fn mock() -> Self {
        Self::with_kernel(Box::new(MockKernel::new()))
    }

    /// Create a new ModelBuilder with TruckKernel (real geometry).
    pub fn truck() -> Self {
        Self::with_kernel(Box::new(TruckKernel::new()))
    }

    /// Enable auto-checking: after every operation, run the topology oracles
    /// on the new body.
    pub fn with_auto_check(mut self) -> Self {
        self.auto_check = true;
        self
    }

    /// Tolerance handed to booleans.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    // ── Primitives ──────────────────────────────────────────────────────

    /// Axis-aligned box centred on `center`.
    pub fn add_box(
        &mut self,
        name: &str,
        center: [f64; 3],
        size: [f64; 3],
    ) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let cuboid = Cuboid::new(frame_at(center), size[0], size[1], size[2]);
        self.insert(name, "Box", Brep::from_box(&cuboid))
    }

    /// Cylinder along z, centred on `center`.
    pub fn add_cylinder(
        &mut self,
        name: &str,
        center: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let cylinder = Cylinder::new(frame_at(center), radius, height);
        self.insert(name, "Cylinder", Brep::from_cylinder(&cylinder))
    }

    pub fn add_sphere(&mut self, name: &str, center: [f64; 3], radius: f64) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let sphere = Sphere::new(Point::new(center[0], center[1], center[2]), radius);
        self.insert(name, "Sphere", Brep::from_sphere(&sphere))
    }

    /// Sweep a planar profile along `vector`.
    pub fn extrude(
        &mut self,
        name: &str,
        profile: &Polygon,
        vector: [f64; 3],
    ) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let v = Vector::new(vector[0], vector[1], vector[2]);
        self.insert(name, "Extrude", Brep::from_extrusion(profile, &v))
    }

    /// Extrude a rectangle in the xy plane by `depth` along z.
    pub fn extrude_rect(
        &mut self,
        name: &str,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        depth: f64,
    ) -> Result<&mut Self, HarnessError> {
        self.extrude(name, &rect_profile(x, y, w, h, 0.0), [0.0, 0.0, depth])
    }

    // ── Booleans ────────────────────────────────────────────────────────

    pub fn union(&mut self, name: &str, a: &str, b: &str) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let (a, b) = (find(&self.bodies, a)?, find(&self.bodies, b)?);
        let result = Brep::from_boolean_union(self.kernel.as_mut(), a, b, self.tolerance);
        self.insert(name, "Union", result)
    }

    pub fn intersect(&mut self, name: &str, a: &str, b: &str) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let (a, b) = (find(&self.bodies, a)?, find(&self.bodies, b)?);
        let result = Brep::from_boolean_intersection(self.kernel.as_mut(), a, b, self.tolerance);
        self.insert(name, "Intersect", result)
    }

    /// Subtract every tool from `target`.
    pub fn subtract(&mut self, name: &str, target: &str, tools: &[&str]) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let target = find(&self.bodies, target)?;
        let tools = tools
            .iter()
            .map(|t| find(&self.bodies, t).cloned())
            .collect::<Result<Vec<Brep>, HarnessError>>()?;
        let result = Brep::from_boolean_difference(self.kernel.as_mut(), target, &tools, self.tolerance);
        self.insert(name, "Subtract", result)
    }

    // ── Modifications ───────────────────────────────────────────────────

    /// Round every edge of `source`.
    pub fn fillet(&mut self, name: &str, source: &str, radius: f64) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let source = find(&self.bodies, source)?;
        let result = source.filleted(self.kernel.as_mut(), radius, &[]);
        self.insert(name, "Fillet", result)
    }

    /// Keep the part of `source` behind the plane through `origin` with
    /// `normal`.
    pub fn trim(
        &mut self,
        name: &str,
        source: &str,
        origin: [f64; 3],
        normal: [f64; 3],
    ) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let source = find(&self.bodies, source)?;
        let plane = Plane::new(
            Point::new(origin[0], origin[1], origin[2]),
            Vector::new(normal[0], normal[1], normal[2]),
        );
        let result = source.trimmed(self.kernel.as_mut(), &plane);
        self.insert(name, "Trim", result)
    }

    pub fn translate(&mut self, name: &str, source: &str, offset: [f64; 3]) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let t = Transformation::translation(Vector::new(offset[0], offset[1], offset[2]));
        let result = find(&self.bodies, source)?.transformed(&t);
        self.insert(name, "Translate", result)
    }

    /// Remove a body by name.
    pub fn remove(&mut self, name: &str) -> Result<Brep, HarnessError> {
        let idx = self
            .bodies
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| HarnessError::BodyNotFound {
                name: name.to_string(),
            })?;
        self.history.push(("Remove".into(), name.to_string()));
        Ok(self.bodies.remove(idx).1)
    }

    // ── History ─────────────────────────────────────────────────────────

    /// Undo the last added body.
    pub fn undo(&mut self) -> Result<&mut Self, HarnessError> {
        let last = self.bodies.pop().ok_or_else(|| HarnessError::EmptyHistory {
            action: "undo".into(),
        })?;
        self.history.push(("Undo".into(), last.0.clone()));
        self.redo_stack.push(last);
        Ok(self)
    }

    /// Restore the last undone body.
    pub fn redo(&mut self) -> Result<&mut Self, HarnessError> {
        let next = self.redo_stack.pop().ok_or_else(|| HarnessError::EmptyHistory {
            action: "redo".into(),
        })?;
        self.history.push(("Redo".into(), next.0.clone()));
        self.bodies.push(next);
        Ok(self)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn body(&self, name: &str) -> Result<&Brep, HarnessError> {
        find(&self.bodies, name)
    }

    /// Named bodies in creation order.
    pub fn bodies(&self) -> impl Iterator<Item = (&str, &Brep)> {
        self.bodies.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Tessellate a named body.
    pub fn tessellate(&self, name: &str) -> Result<Mesh, HarnessError> {
        let (mesh, _) = self.body(name)?.to_tesselation(1e-3, 0.1)?;
        Ok(mesh)
    }

    /// Get topology counts (V, E, F) for a named body.
    pub fn topology_counts(&self, name: &str) -> Result<(usize, usize, usize), HarnessError> {
        Ok(oracle::topology_counts(self.body(name)?)?)
    }

    pub fn volume(&self, name: &str) -> Result<f64, HarnessError> {
        Ok(self.body(name)?.volume()?)
    }

    /// Get a mutable reference to the kernel (for direct calls).
    pub fn kernel_mut(&mut self) -> &mut dyn Kernel {
        self.kernel.as_mut()
    }

    /// Failed operations as (body name, message).
    pub fn errors(&self) -> &[(String, String)] {
        &self.errors
    }

    /// Get the operation history log.
    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }

    // ── File I/O ────────────────────────────────────────────────────────

    /// Save every body and return the JSON string.
    pub fn save(&self) -> Result<String, HarnessError> {
        let bodies: Vec<(&str, &Brep)> = self.bodies().collect();
        file_format::save_bodies(&bodies, &ProjectMetadata::new("harness")).map_err(|e| {
            HarnessError::Export {
                reason: e.to_string(),
            }
        })
    }

    /// Load bodies from JSON, replacing the current ones.
    pub fn load(&mut self, json: &str) -> Result<&mut Self, HarnessError> {
        let (bodies, _) = file_format::load_bodies(json).map_err(|e| HarnessError::Load {
            reason: e.to_string(),
        })?;
        self.history.push(("Load".into(), format!("{} bodies", bodies.len())));
        self.bodies = bodies;
        self.redo_stack.clear();
        Ok(self)
    }

    /// Export a named body as binary STL.
    pub fn export_stl(&self, name: &str) -> Result<Vec<u8>, HarnessError> {
        file_format::export_stl(self.body(name)?, name, &StlOptions::default()).map_err(|e| {
            HarnessError::Export {
                reason: e.to_string(),
            }
        })
    }

    // ── Inline Assertions ───────────────────────────────────────────────

    /// Assert the model has exactly `expected` bodies.
    pub fn assert_body_count(&self, expected: usize) -> Result<&Self, HarnessError> {
        let actual = self.body_count();
        if actual == expected {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "expected {} bodies, got {}. Bodies: {:?}",
                    expected,
                    actual,
                    self.bodies().map(|(n, _)| n).collect::<Vec<_>>()
                ),
            })
        }
    }

    /// Assert that a named body is a solid.
    pub fn assert_has_solid(&self, name: &str) -> Result<&Self, HarnessError> {
        if self.body(name)?.is_solid()? {
            Ok(self)
        } else {
            Err(HarnessError::NoSolid {
                name: name.to_string(),
            })
        }
    }

    /// Assert no operation has failed.
    pub fn assert_no_errors(&self) -> Result<&Self, HarnessError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "expected no errors, got {}: {:?}",
                    self.errors.len(),
                    self.errors
                ),
            })
        }
    }

    /// Assert that some operation failed (useful for negative testing).
    pub fn assert_has_errors(&self) -> Result<&Self, HarnessError> {
        if !self.errors.is_empty() {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: "expected errors, but none found".to_string(),
            })
        }
    }

    // ── Oracle Integration ──────────────────────────────────────────────

    /// Run all mesh oracles on a named body's tessellation.
    pub fn check_mesh(&self, name: &str) -> Result<Vec<oracle::OracleVerdict>, HarnessError> {
        let mesh = self.tessellate(name)?;
        Ok(oracle::run_all_mesh_checks(&mesh))
    }

    /// Run topology oracles on a named body.
    pub fn check_topology(&self, name: &str) -> Result<Vec<oracle::OracleVerdict>, HarnessError> {
        Ok(oracle::run_topology_checks(self.body(name)?))
    }

    // ── Internal Helpers ────────────────────────────────────────────────

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.bodies.iter().any(|(n, _)| n == name) {
            Err(HarnessError::DuplicateName {
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn insert(
        &mut self,
        name: &str,
        op: &str,
        result: Result<Brep, BrepError>,
    ) -> Result<&mut Self, HarnessError> {
        let brep = match result {
            Ok(brep) => brep,
            Err(e) => {
                self.errors.push((name.to_string(), e.to_string()));
                self.history.push((op.to_string(), "Error".to_string()));
                return Err(e.into());
            }
        };
        if self.auto_check {
            if let Some(v) = oracle::run_topology_checks(&brep).into_iter().find(|v| !v.passed) {
                self.errors.push((name.to_string(), v.detail.clone()));
                return Err(HarnessError::OracleFailure {
                    oracle: v.oracle_name,
                    detail: format!("auto_check on {}: {}", name, v.detail),
                });
            }
        }
        self.bodies.push((name.to_string(), brep));
        self.redo_stack.clear();
        self.history.push((op.to_string(), name.to_string()));
        Ok(self)
    }
}
