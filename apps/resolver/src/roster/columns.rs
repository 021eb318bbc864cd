//! Roster header names.
//!
//! These MUST match the headers of the intake spreadsheet exactly (after
//! trimming). Mandatory columns are listed in [`REQUIRED`].

pub const NAME: &str = "Nombre completo";
/// Identity column. Holds the RUT, which is also the document folder name.
pub const KEY: &str = "Folder";
/// Weighted evaluation average (PPE).
pub const SCORE: &str = "PPE";
pub const OVERDUE_DEBT: &str = "Deuda vencida en sistema";
pub const PRIOR_BENEFIT: &str = "¿Ha recibido beneficios anteriormente? ¿Cuál?";
pub const MOTIVE: &str =
    "Motivo, Breve explicación de la situación del estudiante, por la cual se solicita la Beca.";

pub const CAMPUS: &str = "Sede";
pub const PROGRAM: &str = "Carrera";
pub const ENROLLED_WITH_COURSES: &str = "Vigencia con cursos inscritos";
pub const ENTRY_TERM: &str = "Año y Semestre de ingreso";
pub const REQUEST_MOTIVE: &str = "Motivo solicitud.";
pub const LAST_BENEFIT_DATE: &str = "Última fecha en que se entregó el Beneficio";
pub const SUBMITTED_AT: &str = "Hora de inicio";
pub const TUITION_INSTALLMENT: &str = "Monto cuota de Arancel";
pub const ENROLLMENT_FEE: &str = "Monto valor de matrícula";
pub const CURRICULAR_PROGRESS: &str = "Avance curricular (%)";
pub const PPS: &str = "PPS";
pub const SOCIOECONOMIC_LEVEL: &str =
    "Registro Social de Hogares (RSH) o Nivel Socioeconómico (NSE)";
pub const RETENTION_PLAN: &str = "Plan de Retención";

/// Column added by the roster merge.
pub const EVIDENCE: &str = "Análisis_concatenado";

/// Columns whose absence fails ingestion.
pub const REQUIRED: [&str; 6] = [NAME, KEY, SCORE, OVERDUE_DEBT, PRIOR_BENEFIT, MOTIVE];
