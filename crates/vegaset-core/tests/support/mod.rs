//! Shared fixtures: a small two-version catalog and an in-memory network.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use vegaset_core::{
    BackendId, CacheLocation, DatasetCache, Loader, MetadataCatalog, Opener, Reader,
    TransportError,
};

pub const STOCKS_SHA: &str = "7f4951f5b6e2931cd8b9c8b46e95516c86dd39a2";
pub const CARS_SHA: &str = "3bb67023dbf8409112b7195ed01f5f67a68b901a";
pub const OLD_CARS_SHA: &str = "d07c19a7c1ed3f3e2a07a1a5c2a2f5d8c41b2f0e";

/// Two catalog versions, latest first, then by name, then by size.
pub const CATALOG: &str = "\
dataset_name,suffix,file_name,bytes,is_image,is_tabular,is_geo,is_topo,is_spatial,is_json,has_schema,sha,url,tag
7zip,.png,7zip.png,3969,true,false,false,false,false,false,false,be6afbdd303d239a5f61aa6555ef502370745d2e,https://data.test/v2.0.0/7zip.png,v2.0.0
cars,.json,cars.json,100492,false,true,false,false,false,true,true,3bb67023dbf8409112b7195ed01f5f67a68b901a,https://data.test/v2.0.0/cars.json,v2.0.0
earthquakes,.json,earthquakes.json,1219853,false,false,true,false,true,true,false,ed4c47436c09d5cc5f428c233fbd8074c0346fd0,https://data.test/v2.0.0/earthquakes.json,v2.0.0
flights-3m,.parquet,flights-3m.parquet,13493022,false,true,false,false,false,false,true,40ae3dad51c3f8b1a9f2e0e0f0a0d3c1c9bcd8e2,https://data.test/v2.0.0/flights-3m.parquet,v2.0.0
miserables,.json,miserables.json,12372,false,false,false,false,false,true,false,f2ee1d6fc42a4d1ac2c9a5e4f79d7a5a0ecf3b61,https://data.test/v2.0.0/miserables.json,v2.0.0
stocks,.csv,stocks.csv,12245,false,true,false,false,false,false,true,7f4951f5b6e2931cd8b9c8b46e95516c86dd39a2,https://data.test/v2.0.0/stocks.csv,v2.0.0
us-10m,.json,us-10m.json,642361,false,false,false,true,true,true,false,ff7a7e679c46f2d1eb85cc92521b990f1a7a5c7a,https://data.test/v2.0.0/us-10m.json,v2.0.0
cars,.json,cars.json,100492,false,true,false,false,false,true,true,d07c19a7c1ed3f3e2a07a1a5c2a2f5d8c41b2f0e,https://data.test/v1.0.0/cars.json,v1.0.0
stocks,.csv,stocks.csv,12245,false,true,false,false,false,false,true,7f4951f5b6e2931cd8b9c8b46e95516c86dd39a2,https://data.test/v1.0.0/stocks.csv,v1.0.0
";

pub const STOCKS_CSV: &str = "symbol,date,price\n\
MSFT,Jan 1 2000,39.81\n\
MSFT,Feb 1 2000,36.35\n\
AMZN,Jan 1 2000,64.56\n";

pub const CARS_JSON: &str = r#"[
{"Name":"chevrolet chevelle malibu","Miles_per_Gallon":18,"Cylinders":8,"Year":"1970-01-01","Origin":"USA"},
{"Name":"buick skylark 320","Miles_per_Gallon":15,"Cylinders":8,"Year":"1970-01-01","Origin":"USA"}
]"#;

pub const EARTHQUAKES_GEOJSON: &str = r#"{"type":"FeatureCollection","features":[
{"type":"Feature","properties":{"mag":4.9,"place":"74 km SSE of Dili, Timor-Leste"},"geometry":{"type":"Point","coordinates":[125.8694,-9.1809]},"id":"us1000aztz"},
{"type":"Feature","properties":{"mag":2.6,"place":"30 km N of Pahala, Hawaii"},"geometry":{"type":"Point","coordinates":[-155.4915,19.4743]},"id":"hv61949076"}
]}"#;

pub fn catalog() -> MetadataCatalog {
    MetadataCatalog::from_bytes("metadata.csv", CATALOG.as_bytes().to_vec())
}

/// Serves fixed bodies by url and counts every request.
#[derive(Debug, Default)]
pub struct MockOpener {
    bodies: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl MockOpener {
    /// Every url of the fixture catalog, with real bodies for the readable ones.
    pub fn serving_fixture() -> Arc<Self> {
        let mut bodies = HashMap::new();
        for line in CATALOG.lines().skip(1) {
            let fields: Vec<&str> = line.split(',').collect();
            let (file_name, url) = (fields[2], fields[12]);
            let body = match file_name {
                "stocks.csv" => STOCKS_CSV.as_bytes().to_vec(),
                "cars.json" => CARS_JSON.as_bytes().to_vec(),
                "earthquakes.json" => EARTHQUAKES_GEOJSON.as_bytes().to_vec(),
                other => format!("placeholder for {other}").into_bytes(),
            };
            bodies.insert(url.to_string(), body);
        }
        Arc::new(Self {
            bodies,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Opener for MockOpener {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.bodies.get(url) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
            None => Err(format!("404 Not Found: {url}").into()),
        }
    }
}

/// A loader over the fixture catalog with the `arrow` backend.
pub fn loader(opener: Arc<MockOpener>, cache_dir: Option<&Path>) -> Loader {
    loader_for(BackendId::Arrow, opener, cache_dir)
}

pub fn loader_for(
    backend: BackendId,
    opener: Arc<MockOpener>,
    cache_dir: Option<&Path>,
) -> Loader {
    let reader = Reader::from_backend(backend)
        .expect("backend is compiled in")
        .with_catalog(catalog());
    let location = cache_dir.map_or(CacheLocation::Unset, |dir| {
        CacheLocation::Dir(dir.to_path_buf())
    });
    Loader::with_parts(reader, DatasetCache::new(location, opener))
}
