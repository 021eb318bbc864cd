// Prompt constants for the decision stage.

/// Minimum PPE for a request to be considered.
pub const SCORE_THRESHOLD: f64 = 0.5;

/// First field of an echoed header line in a reply.
pub const HEADER_MARKER: &str = "Propuesta Resolución";

/// The header row the oracle is shown and may echo back.
pub const HEADER_LINE: &str =
    "Propuesta Resolución-RESOLUCIÓN-MONTO DE LA BECA-MOTIVO DEL CASO-DOCUMENTOS";

/// Decision prompt template.
/// Slots: {threshold}, {header}, then the applicant fields.
pub const DECISION_PROMPT_TEMPLATE: &str = r#"A continuación se presenta la información de un estudiante. Con base en esta información, por favor genera una "Propuesta Resolución" que indique si se aprueba o rechaza la solicitud de beca, y los detalles de la resolución. Usa las siguientes condiciones para tomar la decisión:

1. Si el PPE es menor a {threshold}, rechaza la solicitud porque no cumple con el requisito mínimo.
2. Si la deuda vencida en el sistema es 0, rechaza la solicitud porque no hay deuda a cubrir.
3. Si los documentos han sido validados por una Trabajadora Social y el estudiante tiene una deuda vencida mayor que 0, aprueba la solicitud con los detalles correspondientes.
4. Si el estudiante ha recibido beneficios anteriormente, verifica si hay algún incumplimiento relacionado y decide en consecuencia.

Información del Estudiante:
PPE: {score}
Nombre completo: {name}
RUT: {key}
Sede: {campus}
Carrera: {program}
Vigencia con cursos inscritos: {enrolled_with_courses}
Año y Semestre de ingreso: {entry_term}
Motivo solicitud: {request_motive}
¿Ha recibido beneficios anteriormente? ¿Cuál?: {prior_benefit}
Última fecha en que se entregó el Beneficio: {last_benefit_date}
Deuda vencida en sistema: {overdue_debt}
Motivo, Breve explicación de la situación del estudiante: {motive}
Análisis_concatenado: {evidence}

Por favor, genera una respuesta en formato de tabla con las siguientes columnas, incluyendo el encabezado, usando guiones (-) como delimitadores:
{header}
Ejemplo:
{header}
Aprobada-La solicitud de beca se aprueba...-Monto a determinar según normativa-El estudiante solicita una beca porque...-Carta de solicitud de beca; Cartola Hogar; Certificado de remuneraciones; FICHA SOCIOECONOMICA
Rechazada-La solicitud de beca se rechaza porque el estudiante no cumple con el requisito mínimo de PPE.-N/A-El estudiante no cumple con el requisito mínimo de PPE.-N/A

**Asegúrate de que cada valor esté correctamente delimitado por guiones y de que no haya espacios adicionales antes o después de los guiones. Incluye solo las 5 columnas especificadas y usa punto y coma para separar múltiples documentos en la columna DOCUMENTOS.**"#;
