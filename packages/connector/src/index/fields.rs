//! Names of the search index fields the connector reads or queries.

pub const PI: &str = "PI";
pub const PI_TOPSTRUCT: &str = "PI_TOPSTRUCT";
pub const PI_PARENT: &str = "PI_PARENT";
pub const URN: &str = "URN";
pub const IMAGEURN: &str = "IMAGEURN";
pub const IMAGEURN_OAI: &str = "IMAGEURN_OAI";
pub const IDDOC: &str = "IDDOC";
pub const IDDOC_PARENT: &str = "IDDOC_PARENT";
pub const ISWORK: &str = "ISWORK";
pub const ISANCHOR: &str = "ISANCHOR";
pub const DATECREATED: &str = "DATECREATED";
pub const DATEUPDATED: &str = "DATEUPDATED";
pub const DC: &str = "DC";
pub const DOCSTRCT: &str = "DOCSTRCT";
pub const SOURCEDOCFORMAT: &str = "SOURCEDOCFORMAT";
pub const LANGUAGE: &str = "LANGUAGE";
pub const LABEL: &str = "LABEL";
pub const ACCESSCONDITION: &str = "ACCESSCONDITION";
pub const NUMPAGES: &str = "NUMPAGES";

pub const MD_TITLE: &str = "MD_TITLE";
pub const MD_CREATOR: &str = "MD_CREATOR";
pub const MD_PUBLISHER: &str = "MD_PUBLISHER";
pub const MD_YEARPUBLISH: &str = "MD_YEARPUBLISH";
pub const MD_PLACEPUBLISH: &str = "MD_PLACEPUBLISH";
pub const MD_LANGUAGE: &str = "MD_LANGUAGE";
pub const MD_SUBJECT: &str = "MD_SUBJECT";
pub const MD_DESCRIPTION: &str = "MD_DESCRIPTION";
pub const MD_RIGHTS: &str = "MD_RIGHTS";
pub const MD_OVERVIEWPAGE_DESCRIPTION: &str = "MD_OVERVIEWPAGE_DESCRIPTION";
pub const MD_OVERVIEWPAGE_PUBLICATIONTEXT: &str = "MD_OVERVIEWPAGE_PUBLICATIONTEXT";

/// Value of `SOURCEDOCFORMAT` for METS-sourced records.
pub const SOURCE_FORMAT_METS: &str = "METS";
/// Value of `SOURCEDOCFORMAT` for LIDO-sourced records.
pub const SOURCE_FORMAT_LIDO: &str = "LIDO";
