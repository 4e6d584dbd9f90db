use serde::{Deserialize, Serialize};

/// One reverse-geocoding candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placemark {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub subregion: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl Placemark {
    /// Short label such as "Rizal Park, Manila, Metro Manila, Philippines".
    pub fn label(&self) -> Option<String> {
        let parts = [
            first_filled(&[&self.name, &self.street]),
            first_filled(&[&self.city, &self.subregion]),
            first_filled(&[&self.region]),
            first_filled(&[&self.country]),
        ];
        let label = parts.into_iter().flatten().collect::<Vec<_>>().join(", ");
        if label.is_empty() { None } else { Some(label) }
    }
}

/// Address label from the best candidate, if any.
pub fn address_label(placemarks: &[Placemark]) -> Option<String> {
    placemarks.first().and_then(Placemark::label)
}

fn first_filled<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| field.as_deref())
        .map(str::trim)
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn label_prefers_name_and_city() {
        let place = Placemark {
            name: some("Rizal Park"),
            street: some("Roxas Blvd"),
            city: some("Manila"),
            subregion: some("Ermita"),
            region: some("Metro Manila"),
            country: some("Philippines"),
        };
        assert_eq!(
            place.label().as_deref(),
            Some("Rizal Park, Manila, Metro Manila, Philippines")
        );
    }

    #[test]
    fn label_falls_back_and_skips_blanks() {
        let place = Placemark {
            name: some(""),
            street: some("Main St"),
            subregion: some("Downtown"),
            country: some("USA"),
            ..Placemark::default()
        };
        assert_eq!(place.label().as_deref(), Some("Main St, Downtown, USA"));
    }

    #[test]
    fn empty_candidates_have_no_label() {
        assert_eq!(Placemark::default().label(), None);
        assert_eq!(address_label(&[]), None);
    }
}
