//! Reference data for resolving entity codes into display identities.
//!
//! The aggregation core works purely on codes; lookups only happen when a
//! ranked row is rendered.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::ReportError;

/// Which reference table a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Airport,
    Carrier,
    Plane,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Airport => "airport",
            EntityKind::Carrier => "carrier",
            EntityKind::Plane => "plane",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Airport {
    pub iata: String,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Carrier {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct PlaneModel {
    pub manufacturer: String,
    pub model_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plane {
    pub tail_number: String,
    pub manufacturer: String,
    pub model_number: String,
    /// Year of manufacture; `None` when the registry does not know it.
    #[serde(default)]
    pub year: Option<u16>,
}

impl fmt::Display for PlaneModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let manufacturer = self.manufacturer.trim();
        let model = self.model_number.trim();
        if manufacturer.is_empty() {
            f.write_str(model)
        } else {
            write!(f, "{manufacturer} {model}")
        }
    }
}

impl Plane {
    pub fn model(&self) -> PlaneModel {
        PlaneModel {
            manufacturer: self.manufacturer.clone(),
            model_number: self.model_number.clone(),
        }
    }
}

// Entity identity is the code alone.
macro_rules! identity_by_code {
    ($ty:ty, $field:ident) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.$field == other.$field
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.$field.hash(state);
            }
        }
    };
}

identity_by_code!(Airport, iata);
identity_by_code!(Carrier, code);
identity_by_code!(Plane, tail_number);

/// Read-only lookup of reference entities by code.
pub trait ReferenceLookup: Sync {
    fn airport(&self, iata: &str) -> Result<&Airport, ReportError>;

    fn carrier(&self, code: &str) -> Result<&Carrier, ReportError>;

    fn plane(&self, tail_number: &str) -> Result<&Plane, ReportError>;

    /// Every known airport, in no particular order.
    fn airports(&self) -> Vec<&Airport>;

    /// Every known plane, in no particular order.
    fn planes(&self) -> Vec<&Plane>;

    /// Human-readable name for `code`, or `None` if the code is unknown.
    fn display_name(&self, kind: EntityKind, code: &str) -> Option<String> {
        match kind {
            EntityKind::Airport => self.airport(code).ok().map(|a| a.name.clone()),
            EntityKind::Carrier => self.carrier(code).ok().map(|c| c.name.clone()),
            EntityKind::Plane => self.plane(code).ok().map(|p| p.model().to_string()),
        }
    }
}

/// Code to attribute snapshot taken from reference data before a pass.
///
/// Classifiers and filters that key on an attribute of a code (an airport's
/// state, a plane's model) carry one of these, so the pass itself never
/// touches the lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTable<V> {
    values: HashMap<String, V>,
}

impl<V> Default for AttributeTable<V> {
    fn default() -> Self {
        AttributeTable {
            values: HashMap::new(),
        }
    }
}

impl<V> AttributeTable<V> {
    pub fn get(&self, code: &str) -> Option<&V> {
        self.values.get(code)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for AttributeTable<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        AttributeTable {
            values: iter.into_iter().collect(),
        }
    }
}

impl AttributeTable<String> {
    /// Airport code to state. Airports without a state are left out.
    pub fn airport_states(lookup: &dyn ReferenceLookup) -> Self {
        let table: Self = lookup
            .airports()
            .into_iter()
            .filter(|a| !a.state.trim().is_empty())
            .map(|a| (a.iata.clone(), a.state.trim().to_string()))
            .collect();
        debug!(airports = table.len(), "Resolved airport states");
        table
    }

    /// Tail number to `"MANUFACTURER MODEL"`. Planes without a model are left out.
    pub fn plane_models(lookup: &dyn ReferenceLookup) -> Self {
        let table: Self = lookup
            .planes()
            .into_iter()
            .filter(|p| !p.model_number.trim().is_empty())
            .map(|p| (p.tail_number.clone(), p.model().to_string()))
            .collect();
        debug!(planes = table.len(), "Resolved plane models");
        table
    }

    /// Codes whose attribute equals `value`.
    pub fn codes_with(&self, value: &str) -> BTreeSet<String> {
        self.values
            .iter()
            .filter(|(_, v)| v.as_str() == value)
            .map(|(code, _)| code.clone())
            .collect()
    }
}

impl AttributeTable<u16> {
    /// Tail number to year of manufacture. Unknown and zero years are left out.
    pub fn plane_years(lookup: &dyn ReferenceLookup) -> Self {
        lookup
            .planes()
            .into_iter()
            .filter_map(|p| match p.year {
                Some(year) if year > 0 => Some((p.tail_number.clone(), year)),
                _ => None,
            })
            .collect()
    }
}

/// In-memory reference tables keyed by code.
#[derive(Debug, Default)]
pub struct Registry {
    airports: HashMap<String, Airport>,
    carriers: HashMap<String, Carrier>,
    planes: HashMap<String, Plane>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Loads `airports.csv`, `carriers.csv` and `planes.csv` from `dir`.
    ///
    /// A missing file leaves the corresponding table empty.
    pub fn load(dir: &Path) -> Result<Self, ReportError> {
        let registry = Registry {
            airports: load_table(&dir.join("airports.csv"), |a: &Airport| a.iata.clone())?,
            carriers: load_table(&dir.join("carriers.csv"), |c: &Carrier| c.code.clone())?,
            planes: load_table(&dir.join("planes.csv"), |p: &Plane| p.tail_number.clone())?,
        };
        info!(
            airports = registry.airports.len(),
            carriers = registry.carriers.len(),
            planes = registry.planes.len(),
            "Reference data loaded"
        );
        Ok(registry)
    }

    pub fn with_airport(mut self, airport: Airport) -> Self {
        self.airports.insert(airport.iata.clone(), airport);
        self
    }

    pub fn with_carrier(mut self, carrier: Carrier) -> Self {
        self.carriers.insert(carrier.code.clone(), carrier);
        self
    }

    pub fn with_plane(mut self, plane: Plane) -> Self {
        self.planes.insert(plane.tail_number.clone(), plane);
        self
    }
}

fn load_table<T, F>(path: &Path, key: F) -> Result<HashMap<String, T>, ReportError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> String,
{
    if !path.exists() {
        debug!(path = %path.display(), "Reference table missing, leaving empty");
        return Ok(HashMap::new());
    }

    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut table = HashMap::new();

    for result in rdr.deserialize() {
        let entity: T = result?;
        table.insert(key(&entity), entity);
    }

    Ok(table)
}

fn not_found(kind: EntityKind, code: &str) -> ReportError {
    ReportError::NotFound {
        kind: kind.as_str(),
        code: code.to_string(),
    }
}

impl ReferenceLookup for Registry {
    fn airport(&self, iata: &str) -> Result<&Airport, ReportError> {
        self.airports
            .get(iata)
            .ok_or_else(|| not_found(EntityKind::Airport, iata))
    }

    fn carrier(&self, code: &str) -> Result<&Carrier, ReportError> {
        self.carriers
            .get(code)
            .ok_or_else(|| not_found(EntityKind::Carrier, code))
    }

    fn plane(&self, tail_number: &str) -> Result<&Plane, ReportError> {
        self.planes
            .get(tail_number)
            .ok_or_else(|| not_found(EntityKind::Plane, tail_number))
    }

    fn airports(&self) -> Vec<&Airport> {
        self.airports.values().collect()
    }

    fn planes(&self) -> Vec<&Plane> {
        self.planes.values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn jfk(name: &str) -> Airport {
        Airport {
            iata: "JFK".into(),
            name: name.into(),
            city: "New York".into(),
            state: "NY".into(),
        }
    }

    #[test]
    fn test_identity_is_code() {
        assert_eq!(jfk("John F Kennedy Intl"), jfk("Kennedy"));
    }

    #[test]
    fn test_lookup_not_found() {
        let registry = Registry::new().with_airport(jfk("John F Kennedy Intl"));

        assert_eq!(registry.airport("JFK").unwrap().state, "NY");
        assert!(matches!(
            registry.carrier("ZZ"),
            Err(ReportError::NotFound { kind: "carrier", .. })
        ));
        assert_eq!(registry.display_name(EntityKind::Airport, "LAX"), None);
    }

    #[test]
    fn test_display_name_for_plane() {
        let registry = Registry::new().with_plane(Plane {
            tail_number: "N712SW".into(),
            manufacturer: "BOEING".into(),
            model_number: "737-7H4".into(),
            year: Some(1998),
        });

        assert_eq!(
            registry.plane("N712SW").unwrap().model(),
            PlaneModel {
                manufacturer: "BOEING".into(),
                model_number: "737-7H4".into(),
            }
        );

        assert_eq!(
            registry.display_name(EntityKind::Plane, "N712SW").as_deref(),
            Some("BOEING 737-7H4")
        );
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("carriers.csv"),
            "code,name\nWN,Southwest Airlines Co.\nAA,American Airlines Inc.\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("planes.csv"),
            "tail_number,manufacturer,model_number,year\nN10156,EMBRAER,EMB-145XR,2004\nN102UW,AIRBUS,A320-214,\n",
        )
        .unwrap();

        let registry = Registry::load(dir.path()).unwrap();

        assert_eq!(registry.carrier("WN").unwrap().name, "Southwest Airlines Co.");
        assert_eq!(registry.plane("N102UW").unwrap().year, None);
        assert_eq!(registry.plane("N10156").unwrap().year, Some(2004));
        assert!(registry.airport("JFK").is_err());
    }

    fn plane(tail_number: &str, manufacturer: &str, model_number: &str, year: Option<u16>) -> Plane {
        Plane {
            tail_number: tail_number.into(),
            manufacturer: manufacturer.into(),
            model_number: model_number.into(),
            year,
        }
    }

    #[test]
    fn test_attribute_tables_skip_missing_values() {
        let registry = Registry::new()
            .with_airport(jfk("John F Kennedy Intl"))
            .with_airport(Airport {
                iata: "XXX".into(),
                name: "Nowhere".into(),
                city: String::new(),
                state: String::new(),
            })
            .with_plane(plane("N1", "BOEING", "737-7H4", Some(1998)))
            .with_plane(plane("N2", "", "A320-214", Some(0)))
            .with_plane(plane("N3", "CESSNA", "", None));

        let states = AttributeTable::airport_states(&registry);
        assert_eq!(states.get("JFK").map(String::as_str), Some("NY"));
        assert_eq!(states.get("XXX"), None);

        let models = AttributeTable::plane_models(&registry);
        assert_eq!(models.len(), 2);
        assert_eq!(models.get("N1").map(String::as_str), Some("BOEING 737-7H4"));
        assert_eq!(models.get("N2").map(String::as_str), Some("A320-214"));

        let years = AttributeTable::plane_years(&registry);
        assert_eq!(years.get("N1"), Some(&1998));
        assert_eq!(years.get("N2"), None);
        assert_eq!(years.get("N3"), None);
    }

    #[test]
    fn test_codes_with_attribute() {
        let states: AttributeTable<String> = [("JFK", "NY"), ("LGA", "NY"), ("LAX", "CA")]
            .into_iter()
            .map(|(code, state)| (code.to_string(), state.to_string()))
            .collect();

        let ny: Vec<_> = states.codes_with("NY").into_iter().collect();
        assert_eq!(ny, vec!["JFK", "LGA"]);
        assert!(states.codes_with("TX").is_empty());
    }
}
