//! Vocabulary used in the emitted graphs.

macro_rules! namespace {
    ($module:ident, $prefix:literal, $ns:literal; $($name:ident = $local:literal),* $(,)?) => {
        pub mod $module {
            pub const PREFIX: &str = $prefix;
            pub const NS: &str = $ns;
            $(pub const $name: &str = concat!($ns, $local);)*
        }
    };
}

namespace!(rdf, "rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    TYPE = "type",
);

namespace!(xsd, "xsd", "http://www.w3.org/2001/XMLSchema#";
    DOUBLE = "double",
    INT = "int",
    DATE_TIME = "dateTime",
    DURATION = "duration",
);

namespace!(pav, "pav", "http://purl.org/pav/";
    CREATED_ON = "createdOn",
);

namespace!(adsbase, "adsbase", "http://ads.harvard.edu/sem/ontology/base#";
    AT_TIME = "atTime",
    DATA_TYPE = "dataType",
    HAS_IVOA_IDENTIFIER = "hasIVOAIdentifier",
    NAME = "name",
    TARGET = "target",
    TITLE = "title",
    USING_INSTRUMENT = "usingInstrument",
);

namespace!(adsobsv, "adsobsv", "http://ads.harvard.edu/sem/ontology/observation#";
    // classes
    ASTRONOMICAL_SOURCE_NAME = "AstronomicalSourceName",
    DATA_COLLECTION = "DataCollection",
    DATUM = "Datum",
    FOOTPRINT = "FootPrint",
    OBSERVATION = "Observation",
    POINTING = "Pointing",
    // properties
    ASSOCIATED_FOOTPRINT = "associatedFootprint",
    ASSOCIATED_POSITION = "associatedPosition",
    AT_OBSERVATORY = "atObservatory",
    AT_TELESCOPE = "atTelescope",
    CALIB_LEVEL = "calibLevel",
    DATA_FORMAT = "dataFormat",
    DATA_PRODUCT_ID = "dataProductId",
    DATA_URL = "dataURL",
    DEC = "dec",
    FOR_OBSERVATION = "forObservation",
    FOV = "fov",
    FROM_DATA_COLLECTION = "fromDataCollection",
    HAS_DATA_PRODUCT = "hasDataProduct",
    OBSERVATION_ID = "observationId",
    OBSERVATION_MADE_BY = "observationMadeBy",
    OBSERVED_TIME = "observedTime",
    RA = "ra",
    RESOLUTION = "resolution",
    S_REGION = "s_region",
    T_EXPTIME = "tExptime",
    T_RESOLUTION = "tResolution",
    WAVELENGTH_DOMAIN = "wavelengthDomain",
    WAVELENGTH_END = "wavelengthEnd",
    WAVELENGTH_START = "wavelengthStart",
);

/// Prefixes declared at the top of serialized documents.
pub const PREFIXES: &[(&str, &str)] = &[
    (rdf::PREFIX, rdf::NS),
    (xsd::PREFIX, xsd::NS),
    (pav::PREFIX, pav::NS),
    (adsbase::PREFIX, adsbase::NS),
    (adsobsv::PREFIX, adsobsv::NS),
];

/// Spectral bands (VODataService waveband names), lower edge in metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmDomain {
    GammaRay,
    XRay,
    Euv,
    Uv,
    Optical,
    Infrared,
    Millimeter,
    Radio,
}

impl EmDomain {
    pub const ALL: [EmDomain; 8] = [
        EmDomain::GammaRay,
        EmDomain::XRay,
        EmDomain::Euv,
        EmDomain::Uv,
        EmDomain::Optical,
        EmDomain::Infrared,
        EmDomain::Millimeter,
        EmDomain::Radio,
    ];

    /// `[lower, upper)` in metres.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            EmDomain::GammaRay => (0.0, 1e-11),
            EmDomain::XRay => (1e-11, 1e-8),
            EmDomain::Euv => (1e-8, 1e-7),
            EmDomain::Uv => (1e-7, 3e-7),
            EmDomain::Optical => (3e-7, 1e-6),
            EmDomain::Infrared => (1e-6, 1e-4),
            EmDomain::Millimeter => (1e-4, 1e-2),
            EmDomain::Radio => (1e-2, f64::INFINITY),
        }
    }

    pub fn local_name(self) -> &'static str {
        match self {
            EmDomain::GammaRay => "Gamma-ray",
            EmDomain::XRay => "X-ray",
            EmDomain::Euv => "EUV",
            EmDomain::Uv => "UV",
            EmDomain::Optical => "Optical",
            EmDomain::Infrared => "Infrared",
            EmDomain::Millimeter => "Millimeter",
            EmDomain::Radio => "Radio",
        }
    }

    pub fn iri(self) -> String {
        format!("{}{}", adsobsv::NS, self.local_name())
    }
}

/// Bands touched by the wavelength interval `[em_min, em_max]` (metres).
/// The bounds may come in either order; non-finite or negative input gives
/// no bands.
pub fn em_domains(em_min: f64, em_max: f64) -> Vec<EmDomain> {
    let (lo, hi) = if em_min <= em_max {
        (em_min, em_max)
    } else {
        (em_max, em_min)
    };
    if !lo.is_finite() || !hi.is_finite() || lo < 0.0 {
        return Vec::new();
    }

    EmDomain::ALL
        .into_iter()
        .filter(|d| {
            let (lower, upper) = d.bounds();
            lo < upper && hi >= lower
        })
        .collect()
}
