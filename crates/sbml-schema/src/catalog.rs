//! The error catalog: numeric codes, categories, messages and the
//! per-revision severity of every record the engine can log.

use crate::revision::Revision;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a logged record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Error or fatal.
    pub fn is_error(self) -> bool {
        self >= Severity::Error
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category a record belongs to; validator categories select on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Internal,
    System,
    Xml,
    Sbml,
    IdentifierConsistency,
    GeneralConsistency,
    UnitsConsistency,
    MathmlConsistency,
    ModelingPractice,
    InternalConsistency,
    L1Compatibility,
    L2v1Compatibility,
    L2v2Compatibility,
    L2v3Compatibility,
    L2v4Compatibility,
    L2v5Compatibility,
    L3v1Compatibility,
    L3v2Compatibility,
    Package,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Internal => "Internal",
            Category::System => "System",
            Category::Xml => "XML content",
            Category::Sbml => "General SBML conformance",
            Category::IdentifierConsistency => "Identifier consistency",
            Category::GeneralConsistency => "General consistency",
            Category::UnitsConsistency => "Units consistency",
            Category::MathmlConsistency => "MathML consistency",
            Category::ModelingPractice => "Modeling practice",
            Category::InternalConsistency => "Internal consistency",
            Category::L1Compatibility => "Translation to SBML L1V2",
            Category::L2v1Compatibility => "Translation to SBML L2V1",
            Category::L2v2Compatibility => "Translation to SBML L2V2",
            Category::L2v3Compatibility => "Translation to SBML L2V3",
            Category::L2v4Compatibility => "Translation to SBML L2V4",
            Category::L2v5Compatibility => "Translation to SBML L2V5",
            Category::L3v1Compatibility => "Translation to SBML L3V1",
            Category::L3v2Compatibility => "Translation to SBML L3V2",
            Category::Package => "Package",
        }
    }

    /// Compatibility category for downgrading to `target`.
    pub fn compatibility_for(target: Revision) -> Category {
        match target {
            Revision::L1V1 | Revision::L1V2 => Category::L1Compatibility,
            Revision::L2V1 => Category::L2v1Compatibility,
            Revision::L2V2 => Category::L2v2Compatibility,
            Revision::L2V3 => Category::L2v3Compatibility,
            Revision::L2V4 => Category::L2v4Compatibility,
            Revision::L2V5 => Category::L2v5Compatibility,
            Revision::L3V1 => Category::L3v1Compatibility,
            Revision::L3V2 => Category::L3v2Compatibility,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of one code in each revision, indexed by [`Revision::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityTable([Severity; 9]);

impl SeverityTable {
    pub const fn uniform(severity: Severity) -> Self {
        SeverityTable([severity; 9])
    }

    /// Unit consistency was mandatory up to L2V3 and advisory afterwards.
    pub const fn strict_until_l2v4() -> Self {
        use Severity::{Error as E, Warning as W};
        SeverityTable([E, E, E, E, E, W, W, W, W])
    }

    pub fn at(&self, revision: Revision) -> Severity {
        self.0[revision.index()]
    }
}

/// One entry of the catalog.
#[derive(Debug, Clone, Copy)]
pub struct ErrorDefinition {
    pub code: u32,
    pub short_name: &'static str,
    pub category: Category,
    pub message: &'static str,
    pub severities: SeverityTable,
}

impl ErrorDefinition {
    pub fn severity(&self, revision: Revision) -> Severity {
        self.severities.at(revision)
    }
}

/// Numeric error codes.
pub mod code {
    pub const UNKNOWN_ERROR: u32 = 0;
    pub const FILE_UNREADABLE: u32 = 2;
    pub const BADLY_FORMED_XML: u32 = 1006;

    pub const UNRECOGNIZED_ELEMENT: u32 = 10102;
    pub const NOT_SCHEMA_CONFORMANT: u32 = 10103;
    pub const INVALID_MATHML: u32 = 10201;
    pub const FUNCTION_CALL_NOT_DEFINED: u32 = 10214;
    pub const UNDEFINED_MATH_IDENTIFIER: u32 = 10215;

    pub const DUPLICATE_COMPONENT_ID: u32 = 10301;
    pub const DUPLICATE_UNIT_DEFINITION_ID: u32 = 10302;
    pub const DUPLICATE_LOCAL_PARAMETER_ID: u32 = 10303;
    pub const DUPLICATE_META_ID: u32 = 10307;
    pub const INVALID_META_ID_SYNTAX: u32 = 10309;
    pub const INVALID_ID_SYNTAX: u32 = 10310;
    pub const INVALID_UNIT_ID_SYNTAX: u32 = 10311;
    pub const UNDEFINED_UNIT_DEFINITION: u32 = 10313;

    pub const INCONSISTENT_ARG_UNITS: u32 = 10501;
    pub const ASSIGN_RULE_PARAMETER_MISMATCH: u32 = 10513;

    pub const INVALID_NAMESPACE_ON_SBML: u32 = 20101;
    pub const MISSING_OR_INCONSISTENT_LEVEL: u32 = 20102;
    pub const MISSING_OR_INCONSISTENT_VERSION: u32 = 20103;
    pub const L3_PACKAGE_ON_LOWER_SBML: u32 = 20109;
    pub const MISSING_MODEL: u32 = 20201;
    pub const FUNCTION_DEF_MATH_NOT_LAMBDA: u32 = 20301;
    pub const EMPTY_LIST_OF_UNITS: u32 = 20409;
    pub const INVALID_SPECIES_COMPARTMENT_REF: u32 = 20601;
    pub const INVALID_INIT_ASSIGN_SYMBOL: u32 = 20801;
    pub const MULTIPLE_INIT_ASSIGNMENTS: u32 = 20802;
    pub const INVALID_ASSIGN_RULE_VARIABLE: u32 = 20901;
    pub const INVALID_RATE_RULE_VARIABLE: u32 = 20902;
    pub const ASSIGN_RULE_TO_CONSTANT: u32 = 20903;
    pub const NO_REACTANTS_OR_PRODUCTS: u32 = 21101;
    pub const INVALID_SPECIES_REFERENCE: u32 = 21111;
    pub const INVALID_MODIFIER_REFERENCE: u32 = 21112;

    pub const PARAMETER_UNITS: u32 = 80701;
    pub const LOCAL_PARAMETER_SHADOWS_ID: u32 = 81121;

    pub const NO_FUNCTION_DEFINITIONS_IN_L1: u32 = 91002;
    pub const NO_INITIAL_ASSIGNMENTS_IN_L1: u32 = 91004;
    pub const NO_SPECIES_TYPES_IN_L1: u32 = 91005;
    pub const NO_NON_INTEGER_STOICHIOMETRY_IN_L1: u32 = 91009;
    pub const NO_UNIT_MULTIPLIERS_OR_OFFSETS_IN_L1: u32 = 91010;
    pub const NO_SBO_TERMS_IN_L1: u32 = 91012;
    pub const STRICT_UNITS_REQUIRED_IN_L1: u32 = 91014;
    pub const NO_MODEL_UNITS_IN_L1: u32 = 91016;

    pub const NO_INITIAL_ASSIGNMENTS_IN_L2V1: u32 = 92004;
    pub const NO_SPECIES_TYPES_IN_L2V1: u32 = 92005;
    pub const NO_SBO_TERMS_IN_L2V1: u32 = 92007;
    pub const NO_ID_ON_SPECIES_REFERENCE_IN_L2V1: u32 = 92008;
    pub const STRICT_UNITS_REQUIRED_IN_L2V1: u32 = 92010;
    pub const NO_MODEL_UNITS_IN_L2V1: u32 = 92011;

    pub const NO_UNIT_OFFSET_IN_L2V2: u32 = 93001;
    pub const NO_KINETIC_LAW_TIME_UNITS_IN_L2V2: u32 = 93002;
    pub const NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V2: u32 = 93003;
    pub const NO_MODEL_UNITS_IN_L2V2: u32 = 93004;
    pub const STRICT_UNITS_REQUIRED_IN_L2V2: u32 = 93005;

    pub const NO_UNIT_OFFSET_IN_L2V3: u32 = 94001;
    pub const NO_KINETIC_LAW_TIME_UNITS_IN_L2V3: u32 = 94002;
    pub const NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V3: u32 = 94003;
    pub const NO_MODEL_UNITS_IN_L2V3: u32 = 94004;
    pub const STRICT_UNITS_REQUIRED_IN_L2V3: u32 = 94005;

    pub const NO_UNIT_OFFSET_IN_L2V4: u32 = 95001;
    pub const NO_KINETIC_LAW_TIME_UNITS_IN_L2V4: u32 = 95002;
    pub const NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V4: u32 = 95003;
    pub const NO_MODEL_UNITS_IN_L2V4: u32 = 95004;

    pub const NO_UNIT_OFFSET_IN_L2V5: u32 = 95501;
    pub const NO_KINETIC_LAW_TIME_UNITS_IN_L2V5: u32 = 95502;
    pub const NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V5: u32 = 95503;
    pub const NO_MODEL_UNITS_IN_L2V5: u32 = 95504;

    pub const NO_SPECIES_TYPES_IN_L3V1: u32 = 96001;
    pub const NO_UNIT_OFFSET_IN_L3V1: u32 = 96002;
    pub const NO_KINETIC_LAW_TIME_UNITS_IN_L3V1: u32 = 96003;
    pub const NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L3V1: u32 = 96004;
    pub const NO_L3V2_MATH_IN_L3V1: u32 = 96005;

    pub const NO_SPECIES_TYPES_IN_L3V2: u32 = 97001;
    pub const NO_UNIT_OFFSET_IN_L3V2: u32 = 97002;
    pub const NO_KINETIC_LAW_TIME_UNITS_IN_L3V2: u32 = 97003;
    pub const NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L3V2: u32 = 97004;

    pub const INVALID_SBML_LEVEL_VERSION: u32 = 99101;
    pub const REQUIRED_PACKAGE_PRESENT: u32 = 99107;
    pub const UNREQUIRED_PACKAGE_PRESENT: u32 = 99108;
    pub const MISSING_REQUIRED_ATTRIBUTE: u32 = 99911;
    pub const INVALID_ATTRIBUTE_VALUE: u32 = 99912;
    pub const UNKNOWN_CORE_ATTRIBUTE: u32 = 99994;
    pub const UNKNOWN_PACKAGE_ATTRIBUTE: u32 = 99995;
}

const fn entry(
    code: u32,
    short_name: &'static str,
    category: Category,
    severities: SeverityTable,
    message: &'static str,
) -> ErrorDefinition {
    ErrorDefinition {
        code,
        short_name,
        category,
        message,
        severities,
    }
}

const INFO: SeverityTable = SeverityTable::uniform(Severity::Info);
const WARNING: SeverityTable = SeverityTable::uniform(Severity::Warning);
const ERROR: SeverityTable = SeverityTable::uniform(Severity::Error);
const FATAL: SeverityTable = SeverityTable::uniform(Severity::Fatal);
const UNITS: SeverityTable = SeverityTable::strict_until_l2v4();

use Category as C;

/// All known codes, sorted by code.
pub const CATALOG: &[ErrorDefinition] = &[
    entry(code::UNKNOWN_ERROR, "UnknownError", C::Internal, FATAL,
        "Encountered unknown internal error."),
    entry(code::FILE_UNREADABLE, "FileUnreadable", C::System, FATAL,
        "File unreadable."),
    entry(code::BADLY_FORMED_XML, "BadlyFormedXML", C::Xml, FATAL,
        "The XML content is not well-formed."),
    entry(code::UNRECOGNIZED_ELEMENT, "UnrecognizedElement", C::Sbml, ERROR,
        "Encountered an element that is not part of the SBML vocabulary at this position."),
    entry(code::NOT_SCHEMA_CONFORMANT, "NotSchemaConformant", C::Sbml, ERROR,
        "Element structure does not conform to the SBML schema."),
    entry(code::INVALID_MATHML, "InvalidMathElement", C::MathmlConsistency, ERROR,
        "Invalid MathML content."),
    entry(code::FUNCTION_CALL_NOT_DEFINED, "UndefinedFunctionCall", C::MathmlConsistency, ERROR,
        "Outside of a <functionDefinition>, a function call may only refer to the identifier of a <functionDefinition>."),
    entry(code::UNDEFINED_MATH_IDENTIFIER, "UndefinedMathIdentifier", C::MathmlConsistency, ERROR,
        "Outside of a <functionDefinition>, an identifier in math must refer to an existing model component."),
    entry(code::DUPLICATE_COMPONENT_ID, "DuplicateComponentId", C::IdentifierConsistency, ERROR,
        "The value of the 'id' attribute must be unique among all components of the model."),
    entry(code::DUPLICATE_UNIT_DEFINITION_ID, "DuplicateUnitDefinitionId", C::IdentifierConsistency, ERROR,
        "The value of the 'id' attribute of every <unitDefinition> must be unique among unit definitions."),
    entry(code::DUPLICATE_LOCAL_PARAMETER_ID, "DuplicateLocalParameterId", C::IdentifierConsistency, ERROR,
        "The value of the 'id' attribute of every local parameter must be unique within its <kineticLaw>."),
    entry(code::DUPLICATE_META_ID, "DuplicateMetaId", C::IdentifierConsistency, ERROR,
        "The value of every 'metaid' attribute must be unique across the whole document."),
    entry(code::INVALID_META_ID_SYNTAX, "InvalidMetaidSyntax", C::IdentifierConsistency, ERROR,
        "The value of a 'metaid' attribute must conform to the XML ID syntax."),
    entry(code::INVALID_ID_SYNTAX, "InvalidIdSyntax", C::IdentifierConsistency, ERROR,
        "The value of an 'id' attribute must conform to the SId syntax."),
    entry(code::INVALID_UNIT_ID_SYNTAX, "InvalidUnitIdSyntax", C::IdentifierConsistency, ERROR,
        "The value of a unit identifier must conform to the UnitSId syntax."),
    entry(code::UNDEFINED_UNIT_DEFINITION, "UndefinedUnitDefinition", C::IdentifierConsistency, ERROR,
        "A units reference must be a base unit or the identifier of a <unitDefinition>."),
    entry(code::INCONSISTENT_ARG_UNITS, "InconsistentArgUnits", C::UnitsConsistency, UNITS,
        "The units of the operands of an addition or subtraction are expected to agree."),
    entry(code::ASSIGN_RULE_PARAMETER_MISMATCH, "AssignRuleParameterMismatch", C::UnitsConsistency, UNITS,
        "The units of an <assignmentRule> math are expected to match the units of the parameter it assigns."),
    entry(code::INVALID_NAMESPACE_ON_SBML, "InvalidNamespaceOnSBML", C::Sbml, ERROR,
        "The <sbml> namespace must match the declared level and version."),
    entry(code::MISSING_OR_INCONSISTENT_LEVEL, "MissingOrInconsistentLevel", C::Sbml, ERROR,
        "The <sbml> element must carry a 'level' attribute consistent with its namespace."),
    entry(code::MISSING_OR_INCONSISTENT_VERSION, "MissingOrInconsistentVersion", C::Sbml, ERROR,
        "The <sbml> element must carry a 'version' attribute consistent with its namespace."),
    entry(code::L3_PACKAGE_ON_LOWER_SBML, "L3PackageOnLowerSBML", C::Sbml, WARNING,
        "Level 3 packages cannot be used in documents of lower levels."),
    entry(code::MISSING_MODEL, "MissingModel", C::GeneralConsistency, ERROR,
        "An SBML document must contain a <model>."),
    entry(code::FUNCTION_DEF_MATH_NOT_LAMBDA, "FunctionDefMathNotLambda", C::GeneralConsistency, ERROR,
        "The math of a <functionDefinition> must be a lambda."),
    entry(code::EMPTY_LIST_OF_UNITS, "EmptyListOfUnits", C::GeneralConsistency, ERROR,
        "A <unitDefinition> must contain at least one <unit>."),
    entry(code::INVALID_SPECIES_COMPARTMENT_REF, "InvalidSpeciesCompartmentRef", C::GeneralConsistency, ERROR,
        "The 'compartment' attribute of a <species> must refer to an existing <compartment>."),
    entry(code::INVALID_INIT_ASSIGN_SYMBOL, "InvalidInitAssignSymbol", C::GeneralConsistency, ERROR,
        "The 'symbol' of an <initialAssignment> must refer to an existing model component."),
    entry(code::MULTIPLE_INIT_ASSIGNMENTS, "MultipleInitAssignments", C::GeneralConsistency, ERROR,
        "A model component may be the target of at most one <initialAssignment>."),
    entry(code::INVALID_ASSIGN_RULE_VARIABLE, "InvalidAssignRuleVariable", C::GeneralConsistency, ERROR,
        "The 'variable' of an <assignmentRule> must refer to an existing model component."),
    entry(code::INVALID_RATE_RULE_VARIABLE, "InvalidRateRuleVariable", C::GeneralConsistency, ERROR,
        "The 'variable' of a <rateRule> must refer to an existing model component."),
    entry(code::ASSIGN_RULE_TO_CONSTANT, "AssignRuleToConstantEntity", C::GeneralConsistency, ERROR,
        "A rule may not assign a component declared constant."),
    entry(code::NO_REACTANTS_OR_PRODUCTS, "NoReactantsOrProducts", C::GeneralConsistency, ERROR,
        "A <reaction> must have at least one reactant or product."),
    entry(code::INVALID_SPECIES_REFERENCE, "InvalidSpeciesReference", C::GeneralConsistency, ERROR,
        "The 'species' attribute of a species reference must refer to an existing <species>."),
    entry(code::INVALID_MODIFIER_REFERENCE, "InvalidModifierReference", C::GeneralConsistency, ERROR,
        "The 'species' attribute of a modifier must refer to an existing <species>."),
    entry(code::PARAMETER_UNITS, "ParameterUnits", C::ModelingPractice, WARNING,
        "It is recommended to declare units for every parameter."),
    entry(code::LOCAL_PARAMETER_SHADOWS_ID, "LocalParameterShadowsId", C::ModelingPractice, WARNING,
        "A local parameter shadows a model-wide identifier."),
    entry(code::NO_FUNCTION_DEFINITIONS_IN_L1, "NoFunctionDefinitionsInL1", C::L1Compatibility, ERROR,
        "SBML Level 1 does not support function definitions."),
    entry(code::NO_INITIAL_ASSIGNMENTS_IN_L1, "NoInitialAssignmentsInL1", C::L1Compatibility, ERROR,
        "SBML Level 1 does not support initial assignments."),
    entry(code::NO_SPECIES_TYPES_IN_L1, "NoSpeciesTypesInL1", C::L1Compatibility, ERROR,
        "SBML Level 1 does not support species types."),
    entry(code::NO_NON_INTEGER_STOICHIOMETRY_IN_L1, "NoNonIntegerStoichiometryInL1", C::L1Compatibility, ERROR,
        "SBML Level 1 only supports integer stoichiometries."),
    entry(code::NO_UNIT_MULTIPLIERS_OR_OFFSETS_IN_L1, "NoUnitMultipliersOrOffsetsInL1", C::L1Compatibility, ERROR,
        "SBML Level 1 does not support unit multipliers or offsets."),
    entry(code::NO_SBO_TERMS_IN_L1, "NoSBOTermsInL1", C::L1Compatibility, WARNING,
        "SBML Level 1 does not support SBO terms; they will be dropped."),
    entry(code::STRICT_UNITS_REQUIRED_IN_L1, "StrictUnitsRequiredInL1", C::L1Compatibility, ERROR,
        "SBML Level 1 requires strict unit consistency."),
    entry(code::NO_MODEL_UNITS_IN_L1, "NoModelUnitsInL1", C::L1Compatibility, WARNING,
        "SBML Level 1 does not support model-wide unit attributes or conversion factors."),
    entry(code::NO_INITIAL_ASSIGNMENTS_IN_L2V1, "NoInitialAssignmentsInL2v1", C::L2v1Compatibility, ERROR,
        "SBML Level 2 Version 1 does not support initial assignments."),
    entry(code::NO_SPECIES_TYPES_IN_L2V1, "NoSpeciesTypesInL2v1", C::L2v1Compatibility, ERROR,
        "SBML Level 2 Version 1 does not support species types."),
    entry(code::NO_SBO_TERMS_IN_L2V1, "NoSBOTermsInL2v1", C::L2v1Compatibility, WARNING,
        "SBML Level 2 Version 1 does not support SBO terms; they will be dropped."),
    entry(code::NO_ID_ON_SPECIES_REFERENCE_IN_L2V1, "NoIdOnSpeciesReferenceInL2v1", C::L2v1Compatibility, WARNING,
        "SBML Level 2 Version 1 does not support identifiers on species references."),
    entry(code::STRICT_UNITS_REQUIRED_IN_L2V1, "StrictUnitsRequiredInL2v1", C::L2v1Compatibility, ERROR,
        "SBML Level 2 Version 1 requires strict unit consistency."),
    entry(code::NO_MODEL_UNITS_IN_L2V1, "NoModelUnitsInL2v1", C::L2v1Compatibility, WARNING,
        "SBML Level 2 Version 1 does not support model-wide unit attributes or conversion factors."),
    entry(code::NO_UNIT_OFFSET_IN_L2V2, "NoUnitOffsetInL2v2", C::L2v2Compatibility, ERROR,
        "The 'offset' attribute on <unit> is not available in SBML Level 2 Version 2."),
    entry(code::NO_KINETIC_LAW_TIME_UNITS_IN_L2V2, "NoKineticLawTimeUnitsInL2v2", C::L2v2Compatibility, ERROR,
        "The 'timeUnits' attribute on <kineticLaw> is not available in SBML Level 2 Version 2."),
    entry(code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V2, "NoKineticLawSubstanceUnitsInL2v2", C::L2v2Compatibility, ERROR,
        "The 'substanceUnits' attribute on <kineticLaw> is not available in SBML Level 2 Version 2."),
    entry(code::NO_MODEL_UNITS_IN_L2V2, "NoModelUnitsInL2v2", C::L2v2Compatibility, WARNING,
        "SBML Level 2 Version 2 does not support model-wide unit attributes or conversion factors."),
    entry(code::STRICT_UNITS_REQUIRED_IN_L2V2, "StrictUnitsRequiredInL2v2", C::L2v2Compatibility, ERROR,
        "SBML Level 2 Version 2 requires strict unit consistency."),
    entry(code::NO_UNIT_OFFSET_IN_L2V3, "NoUnitOffsetInL2v3", C::L2v3Compatibility, ERROR,
        "The 'offset' attribute on <unit> is not available in SBML Level 2 Version 3."),
    entry(code::NO_KINETIC_LAW_TIME_UNITS_IN_L2V3, "NoKineticLawTimeUnitsInL2v3", C::L2v3Compatibility, ERROR,
        "The 'timeUnits' attribute on <kineticLaw> is not available in SBML Level 2 Version 3."),
    entry(code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V3, "NoKineticLawSubstanceUnitsInL2v3", C::L2v3Compatibility, ERROR,
        "The 'substanceUnits' attribute on <kineticLaw> is not available in SBML Level 2 Version 3."),
    entry(code::NO_MODEL_UNITS_IN_L2V3, "NoModelUnitsInL2v3", C::L2v3Compatibility, WARNING,
        "SBML Level 2 Version 3 does not support model-wide unit attributes or conversion factors."),
    entry(code::STRICT_UNITS_REQUIRED_IN_L2V3, "StrictUnitsRequiredInL2v3", C::L2v3Compatibility, ERROR,
        "SBML Level 2 Version 3 requires strict unit consistency."),
    entry(code::NO_UNIT_OFFSET_IN_L2V4, "NoUnitOffsetInL2v4", C::L2v4Compatibility, ERROR,
        "The 'offset' attribute on <unit> is not available in SBML Level 2 Version 4."),
    entry(code::NO_KINETIC_LAW_TIME_UNITS_IN_L2V4, "NoKineticLawTimeUnitsInL2v4", C::L2v4Compatibility, ERROR,
        "The 'timeUnits' attribute on <kineticLaw> is not available in SBML Level 2 Version 4."),
    entry(code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V4, "NoKineticLawSubstanceUnitsInL2v4", C::L2v4Compatibility, ERROR,
        "The 'substanceUnits' attribute on <kineticLaw> is not available in SBML Level 2 Version 4."),
    entry(code::NO_MODEL_UNITS_IN_L2V4, "NoModelUnitsInL2v4", C::L2v4Compatibility, WARNING,
        "SBML Level 2 Version 4 does not support model-wide unit attributes or conversion factors."),
    entry(code::NO_UNIT_OFFSET_IN_L2V5, "NoUnitOffsetInL2v5", C::L2v5Compatibility, ERROR,
        "The 'offset' attribute on <unit> is not available in SBML Level 2 Version 5."),
    entry(code::NO_KINETIC_LAW_TIME_UNITS_IN_L2V5, "NoKineticLawTimeUnitsInL2v5", C::L2v5Compatibility, ERROR,
        "The 'timeUnits' attribute on <kineticLaw> is not available in SBML Level 2 Version 5."),
    entry(code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V5, "NoKineticLawSubstanceUnitsInL2v5", C::L2v5Compatibility, ERROR,
        "The 'substanceUnits' attribute on <kineticLaw> is not available in SBML Level 2 Version 5."),
    entry(code::NO_MODEL_UNITS_IN_L2V5, "NoModelUnitsInL2v5", C::L2v5Compatibility, WARNING,
        "SBML Level 2 Version 5 does not support model-wide unit attributes or conversion factors."),
    entry(code::NO_SPECIES_TYPES_IN_L3V1, "NoSpeciesTypesInL3v1", C::L3v1Compatibility, ERROR,
        "SBML Level 3 Version 1 core does not support species types."),
    entry(code::NO_UNIT_OFFSET_IN_L3V1, "NoUnitOffsetInL3v1", C::L3v1Compatibility, ERROR,
        "The 'offset' attribute on <unit> is not available in SBML Level 3 Version 1."),
    entry(code::NO_KINETIC_LAW_TIME_UNITS_IN_L3V1, "NoKineticLawTimeUnitsInL3v1", C::L3v1Compatibility, ERROR,
        "The 'timeUnits' attribute on <kineticLaw> is not available in SBML Level 3 Version 1."),
    entry(code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L3V1, "NoKineticLawSubstanceUnitsInL3v1", C::L3v1Compatibility, ERROR,
        "The 'substanceUnits' attribute on <kineticLaw> is not available in SBML Level 3 Version 1."),
    entry(code::NO_L3V2_MATH_IN_L3V1, "NoL3v2MathInL3v1", C::L3v1Compatibility, ERROR,
        "The MathML functions 'max', 'min', 'quotient', 'rem' and 'implies' are not available in SBML Level 3 Version 1."),
    entry(code::NO_SPECIES_TYPES_IN_L3V2, "NoSpeciesTypesInL3v2", C::L3v2Compatibility, ERROR,
        "SBML Level 3 Version 2 core does not support species types."),
    entry(code::NO_UNIT_OFFSET_IN_L3V2, "NoUnitOffsetInL3v2", C::L3v2Compatibility, ERROR,
        "The 'offset' attribute on <unit> is not available in SBML Level 3 Version 2."),
    entry(code::NO_KINETIC_LAW_TIME_UNITS_IN_L3V2, "NoKineticLawTimeUnitsInL3v2", C::L3v2Compatibility, ERROR,
        "The 'timeUnits' attribute on <kineticLaw> is not available in SBML Level 3 Version 2."),
    entry(code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L3V2, "NoKineticLawSubstanceUnitsInL3v2", C::L3v2Compatibility, ERROR,
        "The 'substanceUnits' attribute on <kineticLaw> is not available in SBML Level 3 Version 2."),
    entry(code::INVALID_SBML_LEVEL_VERSION, "InvalidSBMLLevelVersion", C::Sbml, ERROR,
        "The level and version of the document must be a valid SBML combination."),
    entry(code::REQUIRED_PACKAGE_PRESENT, "RequiredPackagePresent", C::Sbml, ERROR,
        "The document uses a package that is required but not available; its content cannot be interpreted."),
    entry(code::UNREQUIRED_PACKAGE_PRESENT, "UnrequiredPackagePresent", C::Sbml, INFO,
        "The document uses a package that is not available; its content will be saved but cannot be interpreted."),
    entry(code::MISSING_REQUIRED_ATTRIBUTE, "MissingRequiredAttribute", C::InternalConsistency, ERROR,
        "A required attribute is not set."),
    entry(code::INVALID_ATTRIBUTE_VALUE, "InvalidAttributeValue", C::Sbml, ERROR,
        "An attribute value does not have the expected type."),
    entry(code::UNKNOWN_CORE_ATTRIBUTE, "UnknownCoreAttribute", C::Sbml, ERROR,
        "Encountered an attribute that is not defined for this element."),
    entry(code::UNKNOWN_PACKAGE_ATTRIBUTE, "UnknownPackageAttribute", C::Package, ERROR,
        "Encountered a package attribute that is not defined for this element."),
];

/// Catalog lookup by code.
pub fn definition(code: u32) -> Option<&'static ErrorDefinition> {
    CATALOG
        .binary_search_by_key(&code, |def| def.code)
        .ok()
        .map(|idx| &CATALOG[idx])
}

/// Severity of `code` in `revision`; unknown codes are errors.
pub fn severity_for(code: u32, revision: Revision) -> Severity {
    definition(code)
        .map(|def| def.severity(revision))
        .unwrap_or(Severity::Error)
}

/// The "strict units required" code for a compatibility target, if that
/// target treats unit consistency as mandatory.
pub fn strict_units_required_code(target: Revision) -> Option<u32> {
    match target {
        Revision::L1V1 | Revision::L1V2 => Some(code::STRICT_UNITS_REQUIRED_IN_L1),
        Revision::L2V1 => Some(code::STRICT_UNITS_REQUIRED_IN_L2V1),
        Revision::L2V2 => Some(code::STRICT_UNITS_REQUIRED_IN_L2V2),
        Revision::L2V3 => Some(code::STRICT_UNITS_REQUIRED_IN_L2V3),
        _ => None,
    }
}
