use std::collections::HashMap;
use tracing::debug;

/// Parse the OpenFlights `airlines.dat` export into a carrier-code to
/// display-name map.
///
/// The file has no header; columns are id, name, alias, IATA, ICAO,
/// callsign, country, active. `\N` marks a missing value. Both the IATA and
/// ICAO codes (when present) map to the airline name, since callsign
/// prefixes appear in either form.
pub fn parse_airlines_dat(data: &str) -> HashMap<String, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut names = HashMap::new();
    for record in reader.records() {
        let Ok(record) = record else { continue };
        let Some(name) = record.get(1) else { continue };
        let iata = record.get(3).unwrap_or("");
        let icao = record.get(4).unwrap_or("");

        if !iata.is_empty() && iata != "\\N" {
            names.insert(iata.to_string(), name.to_string());
        }
        if !icao.is_empty() && icao != "\\N" {
            names.insert(icao.to_string(), name.to_string());
        }
    }

    debug!("Parsed {} airline code mappings", names.len());
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_airlines() {
        let data = "\
1,\"American Airlines\",\\N,AA,AAL,AMERICAN,United States,Y
2,\"Ryanair\",\\N,FR,RYR,RYANAIR,Ireland,Y
3,\"No Codes\",\\N,\\N,\\N,NONE,Nowhere,N
";
        let names = parse_airlines_dat(data);
        assert_eq!(
            names.get("AA").map(String::as_str),
            Some("American Airlines")
        );
        assert_eq!(
            names.get("AAL").map(String::as_str),
            Some("American Airlines")
        );
        assert_eq!(names.get("RYR").map(String::as_str), Some("Ryanair"));
        assert!(!names.contains_key("\\N"));
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let data = "1,Truncated\n2,\"Full Airline\",\\N,FA,FAL,FULL,Somewhere,Y\n";
        let names = parse_airlines_dat(data);
        assert_eq!(names.get("FA").map(String::as_str), Some("Full Airline"));
        assert_eq!(names.len(), 2);
    }
}
