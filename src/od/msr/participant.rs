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

use crate::cosmic::rotation::NativeFrame;
use crate::cosmic::{Hardware, Spacecraft};
use crate::od::GroundStation;
use std::fmt;

/// A participant of a measurement signal path.
#[derive(Clone, Debug, PartialEq)]
pub enum Participant {
    Spacecraft(Spacecraft),
    GroundStation(GroundStation),
}

impl Participant {
    pub fn id(&self) -> &str {
        match self {
            Self::Spacecraft(sc) => &sc.id,
            Self::GroundStation(gs) => &gs.id,
        }
    }

    pub fn hardware(&self) -> &[Hardware] {
        match self {
            Self::Spacecraft(sc) => &sc.hardware,
            Self::GroundStation(gs) => &gs.hardware,
        }
    }

    pub fn is_spacecraft(&self) -> bool {
        matches!(self, Self::Spacecraft(_))
    }

    pub fn is_ground_station(&self) -> bool {
        matches!(self, Self::GroundStation(_))
    }

    pub fn as_spacecraft(&self) -> Option<&Spacecraft> {
        match self {
            Self::Spacecraft(sc) => Some(sc),
            Self::GroundStation(_) => None,
        }
    }

    pub fn as_ground_station(&self) -> Option<&GroundStation> {
        match self {
            Self::GroundStation(gs) => Some(gs),
            Self::Spacecraft(_) => None,
        }
    }

    /// Frame in which the position of this participant is natively expressed
    pub fn native_frame(&self) -> NativeFrame {
        match self {
            Self::Spacecraft(_) => NativeFrame::Inertial,
            Self::GroundStation(_) => NativeFrame::BodyFixed,
        }
    }
}

impl From<Spacecraft> for Participant {
    fn from(sc: Spacecraft) -> Self {
        Self::Spacecraft(sc)
    }
}

impl From<GroundStation> for Participant {
    fn from(gs: GroundStation) -> Self {
        Self::GroundStation(gs)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Spacecraft(sc) => write!(f, "spacecraft {}", sc.id),
            Self::GroundStation(gs) => write!(f, "ground station {}", gs.id),
        }
    }
}
