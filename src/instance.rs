//! Module for parsing and representing TSP instances.
//!
//! This module handles the TSP-LIB format files with Euclidean 2D coordinates,
//! and a JSON cache holding coordinates together with the precomputed distances.

use crate::distance::{City, DistanceMatrix};
use crate::error::{Result, TspError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Represents a complete TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TspInstance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// City coordinates, indexed from 0
    pub cities: Vec<City>,
    /// Precomputed distance matrix
    pub distances: DistanceMatrix,
}

impl TspInstance {
    /// Build an instance from coordinates
    pub fn from_cities(name: &str, cities: Vec<City>) -> Result<Self> {
        let distances = DistanceMatrix::build(&cities)?;
        Ok(TspInstance {
            name: name.to_string(),
            comment: String::new(),
            cities,
            distances,
        })
    }

    /// Load either a `.json` cache or a TSP-LIB file, based on the extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::load_cache(path),
            _ => Self::from_file(path),
        }
    }

    /// Parse a TSP instance from a TSP-LIB format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut instance = Self::from_reader(BufReader::new(file))?;

        if instance.name.is_empty() {
            instance.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
        }

        Ok(instance)
    }

    /// Parse TSP-LIB content from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut name = String::new();
        let mut comment = String::new();
        let mut dimension: Option<usize> = None;
        let mut cities: Vec<City> = Vec::new();
        let mut in_coords = false;
        let mut saw_coords = false;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if line == "EOF" {
                break;
            }

            if line.starts_with("NODE_COORD_SECTION") {
                in_coords = true;
                saw_coords = true;
                continue;
            }

            if in_coords {
                // Rows are "<id> <x> <y>"; only the last two tokens matter
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 2 {
                    return Err(TspError::parse(line_no, "expected a coordinate pair"));
                }
                let x: f64 = parts[parts.len() - 2]
                    .parse()
                    .map_err(|_| TspError::parse(line_no, "invalid x coordinate"))?;
                let y: f64 = parts[parts.len() - 1]
                    .parse()
                    .map_err(|_| TspError::parse(line_no, "invalid y coordinate"))?;
                cities.push(City::new(x, y));
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                match key.trim() {
                    "NAME" => name = value.to_string(),
                    "COMMENT" => comment = value.to_string(),
                    "DIMENSION" => {
                        dimension = Some(
                            value
                                .parse()
                                .map_err(|_| TspError::parse(line_no, "invalid dimension"))?,
                        );
                    }
                    "EDGE_WEIGHT_TYPE" => {
                        if value != "EUC_2D" {
                            log::warn!("edge weight type {} treated as EUC_2D", value);
                        }
                    }
                    _ => {}
                }
            }
        }

        if !saw_coords {
            return Err(TspError::parse(0, "missing NODE_COORD_SECTION"));
        }
        if let Some(dim) = dimension {
            if dim != cities.len() {
                log::warn!(
                    "DIMENSION says {} but {} coordinates were read",
                    dim,
                    cities.len()
                );
            }
        }

        let distances = DistanceMatrix::build(&cities)?;

        Ok(TspInstance {
            name,
            comment,
            cities,
            distances,
        })
    }

    /// Save coordinates and distances so that later runs skip the matrix build
    pub fn save_cache<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load an instance previously written by [`TspInstance::save_cache`]
    pub fn load_cache<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let instance: TspInstance = serde_json::from_reader(reader)?;

        instance.distances.check_consistency()?;
        if instance.distances.len() != instance.cities.len() {
            return Err(TspError::InvalidInput(format!(
                "cache holds {} cities but a {}-city distance matrix",
                instance.cities.len(),
                instance.distances.len()
            )));
        }

        Ok(instance)
    }

    /// Number of cities
    pub fn dimension(&self) -> usize {
        self.cities.len()
    }

    /// Get the distance between two cities
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances.distance(i, j)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension();

        let mut total = 0.0;
        let mut count = 0usize;
        let mut max_distance: f64 = 0.0;
        for i in 0..n {
            for j in i + 1..n {
                let d = self.distance(i, j);
                total += d;
                max_distance = max_distance.max(d);
                count += 1;
            }
        }
        let avg_distance = if count > 0 { total / count as f64 } else { 0.0 };

        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for city in &self.cities {
            min_x = min_x.min(city.x);
            max_x = max_x.max(city.x);
            min_y = min_y.min(city.y);
            max_y = max_y.max(city.y);
        }

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            min_x,
            max_x,
            min_y,
            max_y,
            avg_distance,
            max_distance,
        }
    }
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.dimension)?;
        writeln!(
            f,
            "  Bounding box: [{:.2}, {:.2}] x [{:.2}, {:.2}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SQUARE_TSP: &str = "NAME: test
COMMENT: 4 corners of a 3x4 rectangle
TYPE: TSP
DIMENSION: 4
EDGE_WEIGHT_TYPE: EUC_2D
NODE_COORD_SECTION
1 0 0
2 0 4
3 3 0
4 3 4
EOF
";

    #[test]
    fn test_parse_tsplib() {
        let instance = TspInstance::from_reader(Cursor::new(SQUARE_TSP)).unwrap();

        assert_eq!(instance.name, "test");
        assert_eq!(instance.dimension(), 4);
        assert_eq!(instance.cities[1], City::new(0.0, 4.0));
        assert!((instance.distance(0, 3) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_parse_spaced_header_and_floats() {
        let text = "NAME : tiny\nNODE_COORD_SECTION\n1 1.5e1 2.0\n2 18.0 6.0\nEOF\n";
        let instance = TspInstance::from_reader(Cursor::new(text)).unwrap();

        assert_eq!(instance.name, "tiny");
        assert!((instance.distance(0, 1) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_parse_errors() {
        let no_section = "NAME: x\nDIMENSION: 2\nEOF\n";
        assert!(matches!(
            TspInstance::from_reader(Cursor::new(no_section)),
            Err(TspError::Parse { .. })
        ));

        let bad_number = "NODE_COORD_SECTION\n1 0 0\n2 zero 1\nEOF\n";
        assert!(matches!(
            TspInstance::from_reader(Cursor::new(bad_number)),
            Err(TspError::Parse { line: 3, .. })
        ));

        let single_city = "NODE_COORD_SECTION\n1 0 0\nEOF\n";
        assert!(matches!(
            TspInstance::from_reader(Cursor::new(single_city)),
            Err(TspError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_cache_round_trip() {
        let instance = TspInstance::from_reader(Cursor::new(SQUARE_TSP)).unwrap();
        let path = std::env::temp_dir().join(format!("tsp-cache-{}.json", std::process::id()));

        instance.save_cache(&path).unwrap();
        let loaded = TspInstance::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.cities, instance.cities);
        assert_eq!(loaded.distances, instance.distances);
    }

    #[test]
    fn test_cache_rejects_negative_distance() {
        let json = r#"{"name":"bad","comment":"","cities":[{"x":0.0,"y":0.0},{"x":1.0,"y":0.0}],"distances":{"size":2,"lower":[-1.0]}}"#;
        let path = std::env::temp_dir().join(format!("tsp-bad-cache-{}.json", std::process::id()));
        std::fs::write(&path, json).unwrap();

        let result = TspInstance::load_cache(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(TspError::InvalidInput(_))));
    }

    #[test]
    fn test_statistics() {
        let instance = TspInstance::from_reader(Cursor::new(SQUARE_TSP)).unwrap();
        let stats = instance.statistics();

        assert_eq!(stats.dimension, 4);
        assert!((stats.max_distance - 5.0).abs() < 1e-10);
        assert!((stats.avg_distance - 4.0).abs() < 1e-10);
    }
}
