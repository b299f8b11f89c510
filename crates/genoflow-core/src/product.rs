//! Mapping from the detected input mode to a product code.

pub const PRODUCT_CODE_GENOTEK_VCF: &str = "upload_genotek_b2c_array_vcf";
pub const PRODUCT_CODE_23ANDME: &str = "upload_23andme_v5_b2c_array_txt";

/// Derive the product code for a validated file.
///
/// Unrecognised modes fall back to the 23andMe code; a warning is logged so
/// unexpected modes show up in the logs.
pub fn product_code_for_mode(mode: &str) -> &'static str {
    match mode {
        "vcf" => PRODUCT_CODE_GENOTEK_VCF,
        "tsv" | "csv" => PRODUCT_CODE_23ANDME,
        other => {
            tracing::warn!(mode = %other, "Unrecognised input mode, using default product code");
            PRODUCT_CODE_23ANDME
        }
    }
}
