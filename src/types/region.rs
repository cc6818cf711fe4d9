//! Static catalog of GCP regions and multi-regions

use crate::error::GcpError;
use std::fmt;
use std::str::FromStr;

macro_rules! regions {
    ($($variant:ident => ($continent:expr, $id:expr, $description:expr)),+ $(,)?) => {
        /// A Google Cloud region
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Region {
            $($variant),+
        }

        impl Region {
            /// Every known region, in catalog order
            pub const ALL: &'static [Region] = &[$(Region::$variant),+];

            pub fn continent(self) -> &'static str {
                match self {
                    $(Region::$variant => $continent),+
                }
            }

            /// Region identifier such as `us-west1`
            pub fn region_id(self) -> &'static str {
                match self {
                    $(Region::$variant => $id),+
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $(Region::$variant => $description),+
                }
            }
        }
    };
}

regions! {
    UsWest1 => ("North America", "us-west1", "Oregon"),
    UsWest2 => ("North America", "us-west2", "Los Angeles"),
    UsWest3 => ("North America", "us-west3", "Salt Lake City"),
    UsWest4 => ("North America", "us-west4", "Las Vegas"),
    UsCentral1 => ("North America", "us-central1", "Iowa"),
    UsCentral2 => ("North America", "us-central2", "Oklahoma (private Google Cloud region)"),
    NorthamericaNortheast1 => ("North America", "northamerica-northeast1", "Montréal"),
    NorthamericaNortheast2 => ("North America", "northamerica-northeast2", "Toronto"),
    NorthamericaSouth1 => ("North America", "northamerica-south1", "Queretaro"),
    UsEast1 => ("North America", "us-east1", "South Carolina"),
    UsEast4 => ("North America", "us-east4", "Northern Virginia"),
    UsEast5 => ("North America", "us-east5", "Columbus"),
    UsSouth1 => ("North America", "us-south1", "Dallas"),
    SouthamericaWest1 => ("South America", "southamerica-west1", "Santiago"),
    SouthamericaEast1 => ("South America", "southamerica-east1", "São Paulo"),
    EuropeWest2 => ("Europe", "europe-west2", "London"),
    EuropeWest1 => ("Europe", "europe-west1", "Belgium"),
    EuropeWest4 => ("Europe", "europe-west4", "Netherlands"),
    EuropeWest8 => ("Europe", "europe-west8", "Milan"),
    EuropeSouthwest1 => ("Europe", "europe-southwest1", "Madrid"),
    EuropeWest9 => ("Europe", "europe-west9", "Paris"),
    EuropeWest12 => ("Europe", "europe-west12", "Turin"),
    EuropeWest10 => ("Europe", "europe-west10", "Berlin"),
    EuropeWest3 => ("Europe", "europe-west3", "Frankfurt"),
    EuropeNorth1 => ("Europe", "europe-north1", "Finland"),
    EuropeNorth2 => ("Europe", "europe-north2", "Stockholm"),
    EuropeCentral2 => ("Europe", "europe-central2", "Warsaw"),
    EuropeWest6 => ("Europe", "europe-west6", "Zürich"),
    MeCentral1 => ("Middle East", "me-central1", "Doha"),
    MeCentral2 => ("Middle East", "me-central2", "Dammam"),
    MeWest1 => ("Middle East", "me-west1", "Tel Aviv"),
    AsiaSouth1 => ("Asia", "asia-south1", "Mumbai"),
    AsiaSouth2 => ("Asia", "asia-south2", "Delhi"),
    AsiaSoutheast1 => ("Asia", "asia-southeast1", "Singapore"),
    AsiaSoutheast2 => ("Asia", "asia-southeast2", "Jakarta"),
    AsiaEast2 => ("Asia", "asia-east2", "Hong Kong"),
    AsiaEast1 => ("Asia", "asia-east1", "Taiwan"),
    AsiaNortheast1 => ("Asia", "asia-northeast1", "Tokyo"),
    AsiaNortheast2 => ("Asia", "asia-northeast2", "Osaka"),
    AsiaNortheast3 => ("Asia", "asia-northeast3", "Seoul"),
    AustraliaSoutheast1 => ("Australia", "australia-southeast1", "Sydney"),
    AustraliaSoutheast2 => ("Australia", "australia-southeast2", "Melbourne"),
    AfricaSouth1 => ("Africa", "africa-south1", "Johannesburg"),
}

impl FromStr for Region {
    type Err = GcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.region_id() == normalized)
            .ok_or_else(|| GcpError::InvalidArgument(format!("Unknown region id: '{}'", s)))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.region_id())
    }
}

/// A Firestore-style multi-region: two read-write regions plus a witness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiRegion {
    Eur3,
    Nam5,
    Nam7,
}

impl MultiRegion {
    pub const ALL: &'static [MultiRegion] = &[MultiRegion::Eur3, MultiRegion::Nam5, MultiRegion::Nam7];

    pub fn multi_region_id(self) -> &'static str {
        match self {
            MultiRegion::Eur3 => "eur3",
            MultiRegion::Nam5 => "nam5",
            MultiRegion::Nam7 => "nam7",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MultiRegion::Eur3 => "Europe",
            MultiRegion::Nam5 => "United States (Central)",
            MultiRegion::Nam7 => "United States (Central and East)",
        }
    }

    pub fn read_write_regions(self) -> [Region; 2] {
        match self {
            MultiRegion::Eur3 => [Region::EuropeWest1, Region::EuropeWest4],
            MultiRegion::Nam5 => [Region::UsCentral1, Region::UsCentral2],
            MultiRegion::Nam7 => [Region::UsCentral1, Region::UsEast4],
        }
    }

    pub fn witness_region(self) -> Region {
        match self {
            MultiRegion::Eur3 => Region::EuropeNorth1,
            MultiRegion::Nam5 => Region::UsEast1,
            MultiRegion::Nam7 => Region::UsCentral2,
        }
    }
}

impl FromStr for MultiRegion {
    type Err = GcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        MultiRegion::ALL
            .iter()
            .copied()
            .find(|m| m.multi_region_id() == normalized)
            .ok_or_else(|| GcpError::InvalidArgument(format!("Unknown multi-region id: '{}'", s)))
    }
}

impl fmt::Display for MultiRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.multi_region_id())
    }
}
