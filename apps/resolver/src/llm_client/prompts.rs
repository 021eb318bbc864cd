// Shared prompt constants for the two oracle roles.
// The decision prompt template itself lives next to the decision generator.

/// System prompt sent with every decision request.
pub const DECISION_SYSTEM: &str = "Eres un asistente social.";

/// Instruction sent alongside every rasterized document page.
pub const PAGE_ANALYSIS_PROMPT: &str = "\
    Analiza esta página de un documento de respaldo de una solicitud de beca. \
    Identifica el tipo de documento (por ejemplo: Carta de solicitud de beca, Cartola Hogar, \
    Certificado de remuneraciones, FICHA SOCIOECONOMICA, certificado médico). \
    Resume en pocas frases la información relevante para evaluar la situación económica \
    del estudiante: montos, fechas, integrantes del hogar, deudas y si el documento \
    indica validación de una Trabajadora Social. \
    Si el documento menciona una postulación FUAS, escribe 'Postulación FUAS: <resultado>.' \
    Responde solo con texto plano, sin listas ni formato markdown.";
