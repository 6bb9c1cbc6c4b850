/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{ElementKind, MeasurementBias, SolveForElement, SolveForObjects, StateUncertainty};
use crate::cosmic::{OrbitDual, Spacecraft};
use crate::linalg::{DMatrix, DVector, Vector6};
use crate::od::{EstimationStateManager, ODError};
use crate::time::Epoch;
use std::fmt;

/// Estimation state made of the Cartesian state of one spacecraft, followed by the components of the measurement biases.
#[derive(Clone, Debug)]
pub struct CartesianStateManager {
    elements: Vec<SolveForElement>,
    /// Objects at the current propagation epoch
    objects: SolveForObjects,
    /// Spacecraft at the estimation epoch
    estimate: Spacecraft,
    stm: DMatrix<f64>,
    apriori: Option<DMatrix<f64>>,
}

impl CartesianStateManager {
    /// Estimates the Cartesian state of the spacecraft, at the epoch of its orbit, and the provided biases
    pub fn new(spacecraft: Spacecraft, biases: Vec<MeasurementBias>) -> Self {
        let mut elements: Vec<SolveForElement> = ElementKind::CARTESIAN
            .iter()
            .map(|kind| SolveForElement::new(&spacecraft.id, *kind))
            .collect();

        for bias in &biases {
            for component in 0..bias.values.len() {
                elements.push(SolveForElement::new(
                    &bias.tracker,
                    ElementKind::Bias {
                        msr_type: bias.msr_type,
                        component,
                    },
                ));
            }
        }

        let size = elements.len();
        Self {
            elements,
            objects: SolveForObjects {
                spacecraft: vec![spacecraft.clone()],
                biases,
            },
            estimate: spacecraft,
            stm: DMatrix::identity(size, size),
            apriori: None,
        }
    }

    /// Sets the apriori covariance, which must be square and of the size of the estimation state
    pub fn with_apriori(mut self, covariance: DMatrix<f64>) -> Result<Self, ODError> {
        let size = self.elements.len();
        if covariance.shape() != (size, size) {
            return Err(ODError::config(format!(
                "apriori covariance is {}x{} but the estimation state has {size} elements",
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        self.apriori = Some(covariance);
        Ok(self)
    }

    /// Sets the apriori covariance from the one sigma uncertainties
    pub fn with_uncertainty(self, uncertainty: StateUncertainty) -> Result<Self, ODError> {
        let covar = uncertainty.covariance(self.elements.len() - 6)?;
        self.with_apriori(covar)
    }

    /// The spacecraft at the estimation epoch, i.e. the current estimate
    pub fn estimated_spacecraft(&self) -> &Spacecraft {
        &self.estimate
    }

    fn current_spacecraft(&self) -> &Spacecraft {
        // The constructor always stores exactly one spacecraft.
        &self.objects.spacecraft[0]
    }

    fn bias_vector(&self) -> impl Iterator<Item = f64> + '_ {
        self.objects
            .biases
            .iter()
            .flat_map(|b| b.values.iter().copied())
    }

    fn stack(&self, cartesian: Vector6<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.elements.len(),
            cartesian.iter().copied().chain(self.bias_vector()),
        )
    }
}

impl EstimationStateManager for CartesianStateManager {
    fn state_size(&self) -> usize {
        self.elements.len()
    }

    fn solve_for_elements(&self) -> &[SolveForElement] {
        &self.elements
    }

    fn objects(&self) -> &SolveForObjects {
        &self.objects
    }

    fn estimation_epoch(&self) -> Epoch {
        self.estimate.orbit.epoch
    }

    fn epoch(&self) -> Epoch {
        self.current_spacecraft().orbit.epoch
    }

    fn state(&self) -> DVector<f64> {
        self.stack(self.current_spacecraft().orbit.to_cartesian_vec())
    }

    fn estimation_state(&self) -> DVector<f64> {
        self.stack(self.estimate.orbit.to_cartesian_vec())
    }

    fn map_vector_to_objects(&mut self, estimate: &DVector<f64>) -> Result<(), ODError> {
        let size = self.elements.len();
        if estimate.len() != size {
            return Err(ODError::Measurement {
                details: format!(
                    "estimate has {} elements but the estimation state has {size}",
                    estimate.len()
                ),
            });
        }

        let cartesian = Vector6::from_iterator(estimate.iter().take(6).copied());
        let epoch = self.estimation_epoch();
        self.estimate.orbit = self.estimate.orbit.with_cartesian_vec(&cartesian, epoch);

        let mut idx = 6;
        for bias in self.objects.biases.iter_mut() {
            for value in bias.values.iter_mut() {
                *value = estimate[idx];
                idx += 1;
            }
        }

        self.objects.spacecraft[0] = self.estimate.clone();
        self.stm = DMatrix::identity(size, size);
        Ok(())
    }

    fn map_objects_to_vector(&mut self) -> DVector<f64> {
        self.state()
    }

    fn map_objects_to_stm(&self) -> DMatrix<f64> {
        self.stm.clone()
    }

    fn map_stm_to_objects(&mut self, stm: &DMatrix<f64>) -> Result<(), ODError> {
        let size = self.elements.len();
        if stm.shape() != (size, size) {
            return Err(ODError::Measurement {
                details: format!(
                    "state transition matrix is {}x{} but the estimation state has {size} elements",
                    stm.nrows(),
                    stm.ncols()
                ),
            });
        }
        self.stm = stm.clone();
        Ok(())
    }

    fn propagation_state(&self) -> DVector<f64> {
        let cartesian = self.current_spacecraft().orbit.to_cartesian_vec();
        DVector::from_column_slice(cartesian.as_slice())
    }

    fn set_propagated(
        &mut self,
        epoch: Epoch,
        state: &DVector<f64>,
        stm: &DMatrix<f64>,
    ) -> Result<(), ODError> {
        if state.len() != 6 || stm.shape() != (6, 6) {
            return Err(ODError::Measurement {
                details: format!(
                    "propagated state has {} elements and its STM is {}x{}, expected 6 and 6x6",
                    state.len(),
                    stm.nrows(),
                    stm.ncols()
                ),
            });
        }

        let cartesian = Vector6::from_iterator(state.iter().copied());
        let orbit = self.objects.spacecraft[0]
            .orbit
            .with_cartesian_vec(&cartesian, epoch);
        self.objects.spacecraft[0].orbit = orbit;

        // Biases are constant, so their block of the STM is the identity.
        let size = self.elements.len();
        let mut full = DMatrix::identity(size, size);
        full.view_mut((0, 0), (6, 6)).copy_from(stm);
        self.stm = full;
        Ok(())
    }

    fn apriori_covariance(&self) -> Option<DMatrix<f64>> {
        self.apriori.clone()
    }

    fn cartesian_to_solve_for_matrix(&self) -> DMatrix<f64> {
        DMatrix::identity(self.elements.len(), self.elements.len())
    }

    fn solve_for_to_cartesian_matrix(&self) -> DMatrix<f64> {
        DMatrix::identity(self.elements.len(), self.elements.len())
    }

    fn solve_for_to_keplerian_matrix(&self) -> Result<DMatrix<f64>, ODError> {
        let size = self.elements.len();
        let jac = OrbitDual::from(self.estimate.orbit).keplerian_jacobian();
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(ODError::Measurement {
                details: format!(
                    "Keplerian elements are singular for {}",
                    self.estimate.orbit
                ),
            });
        }
        let mut full = DMatrix::identity(size, size);
        full.view_mut((0, 0), (6, 6)).copy_from(&jac);
        Ok(full)
    }
}

impl fmt::Display for CartesianStateManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.estimate)?;
        for bias in &self.objects.biases {
            write!(f, "\n{} {} bias: {:?}", bias.tracker, bias.msr_type, bias.values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod ut_cartesian {
    use super::*;
    use crate::cosmic::Orbit;
    use crate::linalg::Matrix6;
    use crate::od::msr::MeasurementType;
    use crate::time::TimeUnits;

    fn manager() -> CartesianStateManager {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let orbit = Orbit::keplerian(7000.0, 0.01, 30.0, 10.0, 20.0, 40.0, epoch);
        CartesianStateManager::new(
            Spacecraft::new("SC", orbit),
            vec![MeasurementBias::zero("GS", MeasurementType::AzEl)],
        )
    }

    #[test]
    fn elements_and_vectors() {
        let mut esm = manager();
        assert_eq!(esm.state_size(), 8);
        assert_eq!(esm.solve_for_elements()[0].to_string(), "SC.PositionX");
        assert_eq!(
            esm.solve_for_elements()[7].kind,
            ElementKind::Bias {
                msr_type: MeasurementType::AzEl,
                component: 1
            }
        );

        let mut x = esm.estimation_state();
        x[0] += 1.0;
        x[7] = 0.25;
        esm.map_vector_to_objects(&x).unwrap();
        assert_eq!(esm.state(), x);
        assert_eq!(
            esm.objects()
                .bias_for("GS", MeasurementType::AzEl)
                .unwrap()
                .values,
            vec![0.0, 0.25]
        );
        assert!(esm.map_vector_to_objects(&DVector::zeros(3)).is_err());
    }

    #[test]
    fn propagated_stm_is_block_diagonal() {
        let mut esm = manager();
        let later = esm.estimation_epoch() + 10.seconds();
        let mut stm = Matrix6::identity();
        stm[(0, 3)] = 10.0;
        let stm = DMatrix::from_column_slice(6, 6, stm.as_slice());
        let state = esm.propagation_state();
        esm.set_propagated(later, &state, &stm).unwrap();

        assert_eq!(esm.epoch(), later);
        let full = esm.map_objects_to_stm();
        assert_eq!(full.shape(), (8, 8));
        assert_eq!(full[(0, 3)], 10.0);
        assert_eq!(full[(6, 6)], 1.0);
        assert_eq!(full[(0, 6)], 0.0);

        // Mapping the estimate back resets the objects to the estimation epoch.
        let x = esm.estimation_state();
        esm.map_vector_to_objects(&x).unwrap();
        assert_eq!(esm.epoch(), esm.estimation_epoch());
        assert_eq!(esm.map_objects_to_stm(), DMatrix::identity(8, 8));
    }

    #[test]
    fn apriori_and_keplerian() {
        let esm = manager()
            .with_uncertainty(StateUncertainty::builder().build())
            .unwrap();
        assert_eq!(esm.apriori_covariance().unwrap().shape(), (8, 8));
        assert!(manager().with_apriori(DMatrix::identity(6, 6)).is_err());

        let kep = esm.solve_for_to_keplerian_matrix().unwrap();
        assert_eq!(kep.shape(), (8, 8));
        assert_eq!(kep[(7, 7)], 1.0);
        // d(sma)/d(state) is non zero
        assert!(kep.row(0).iter().take(6).any(|v| v.abs() > 0.0));
    }
}
