// keys/common.rs
//! The closed set of key types understood by the parser.

/// Two-letter key codes.
///
/// The enumeration is closed; any code outside it lexes as
/// [`KeyType::Unknown`] so that newer keys can be skipped without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyType {
    /// `CF`: file format and processor type.
    Format,
    /// `CK`: key group start, carries the "file is closed" flag.
    KeyGroup,
    /// `NO`: origin of the file.
    Origin,
    /// `NL`: code page and language.
    Language,
    /// `NU`: user defined key.
    UserKey,
    /// `CB`: group definition.
    Group,
    /// `CT`: text or text array.
    Text,
    /// `CI`: single value.
    SingleValue,
    /// `CG`: data field.
    Field,
    /// `CD`: x-axis scaling.
    XScaling,
    /// `NT`: trigger time.
    TriggerTime,
    /// `CZ`: z-axis scaling.
    ZScaling,
    /// `CC`: component start.
    Component,
    /// `CP`: pack information.
    PackInfo,
    /// `Cb`: buffer descriptions.
    BufferInfo,
    /// `CR`: calibration.
    Calibration,
    /// `ND`: display properties.
    DisplayInfo,
    /// `Cv`: reference into an event list.
    EventReference,
    /// `CV`: event list.
    EventList,
    /// `CN`: channel name and group membership.
    Channel,
    /// `CS`: raw sample data.
    RawBlock,
    /// `Np`: property list attached to the preceding entity.
    PropertyList,
    /// `Ca`: add-reference, not supported.
    AddReference,
    /// `NE`: internal marker written by some imc tools.
    Internal,
    /// Any other code.
    Unknown,
}

impl KeyType {
    /// Map the two code letters to a key type.
    pub fn from_code(code: [u8; 2]) -> Self {
        match &code {
            b"CF" => KeyType::Format,
            b"CK" => KeyType::KeyGroup,
            b"NO" => KeyType::Origin,
            b"NL" => KeyType::Language,
            b"NU" => KeyType::UserKey,
            b"CB" => KeyType::Group,
            b"CT" => KeyType::Text,
            b"CI" => KeyType::SingleValue,
            b"CG" => KeyType::Field,
            b"CD" => KeyType::XScaling,
            b"NT" => KeyType::TriggerTime,
            b"CZ" => KeyType::ZScaling,
            b"CC" => KeyType::Component,
            b"CP" => KeyType::PackInfo,
            b"Cb" => KeyType::BufferInfo,
            b"CR" => KeyType::Calibration,
            b"ND" => KeyType::DisplayInfo,
            b"Cv" => KeyType::EventReference,
            b"CV" => KeyType::EventList,
            b"CN" => KeyType::Channel,
            b"CS" => KeyType::RawBlock,
            b"Np" => KeyType::PropertyList,
            b"Ca" => KeyType::AddReference,
            b"NE" => KeyType::Internal,
            _ => KeyType::Unknown,
        }
    }

    /// The two code letters written for this key type.
    ///
    /// Returns `None` for [`KeyType::Unknown`], which is never written.
    pub fn code(&self) -> Option<&'static [u8; 2]> {
        let code = match self {
            KeyType::Format => b"CF",
            KeyType::KeyGroup => b"CK",
            KeyType::Origin => b"NO",
            KeyType::Language => b"NL",
            KeyType::UserKey => b"NU",
            KeyType::Group => b"CB",
            KeyType::Text => b"CT",
            KeyType::SingleValue => b"CI",
            KeyType::Field => b"CG",
            KeyType::XScaling => b"CD",
            KeyType::TriggerTime => b"NT",
            KeyType::ZScaling => b"CZ",
            KeyType::Component => b"CC",
            KeyType::PackInfo => b"CP",
            KeyType::BufferInfo => b"Cb",
            KeyType::Calibration => b"CR",
            KeyType::DisplayInfo => b"ND",
            KeyType::EventReference => b"Cv",
            KeyType::EventList => b"CV",
            KeyType::Channel => b"CN",
            KeyType::RawBlock => b"CS",
            KeyType::PropertyList => b"Np",
            KeyType::AddReference => b"Ca",
            KeyType::Internal => b"NE",
            KeyType::Unknown => return None,
        };
        Some(code)
    }
}

impl core::fmt::Display for KeyType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{}{}", code[0] as char, code[1] as char),
            None => write!(f, "??"),
        }
    }
}
