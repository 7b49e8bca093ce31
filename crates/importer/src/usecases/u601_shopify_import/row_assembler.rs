use thiserror::Error;

use super::description::DescriptionSynthesizer;
use super::schema_resolver::{CanonicalField, ColumnMap};
use super::variant_grouper::{VariantGrouper, VariantOptions};
use crate::shared::format::format_float;
use crate::shared::formula::{CompiledFormula, FormulaContext, FormulaError, Value};
use crate::shared::table::{SourceRow, SourceTable};
use contracts::shared::shopify_schema::CanonicalRecord;
use contracts::usecases::u601_shopify_import::ImportConfig;

/// Ошибка сборки записи. Строка исключается из выгрузки.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssembleError {
    #[error("Invalid or missing weight")]
    InvalidWeight,

    #[error("{0}")]
    Formula(#[from] FormulaError),
}

/// Формулы запуска, разобранные один раз
#[derive(Debug, Clone)]
pub struct FormulaSet {
    pub price: CompiledFormula,
    pub cost: CompiledFormula,
    pub grams: CompiledFormula,
    pub vendor: CompiledFormula,
    pub product_type: CompiledFormula,
    pub title: CompiledFormula,
    pub tags: Option<CompiledFormula>,
    pub seo_title: CompiledFormula,
    pub seo_description: CompiledFormula,
    pub sku: Option<CompiledFormula>,
}

impl FormulaSet {
    pub fn compile(config: &ImportConfig) -> Self {
        let optional = |source: &Option<String>| {
            source
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(CompiledFormula::compile)
        };

        Self {
            price: CompiledFormula::compile(&config.pricing_formula),
            cost: CompiledFormula::compile(&config.cost_formula),
            grams: CompiledFormula::compile(&config.grams_formula),
            vendor: CompiledFormula::compile(&config.vendor_formula),
            product_type: CompiledFormula::compile(&config.product_type_formula),
            title: CompiledFormula::compile(&config.title_formula),
            tags: optional(&config.tags_formula),
            seo_title: CompiledFormula::compile(&config.seo_title_formula),
            seo_description: CompiledFormula::compile(&config.seo_description_formula),
            sku: optional(&config.sku_formula),
        }
    }
}

/// Header as a formula variable: "Flow Rate (GPM)" -> "flow_rate_gpm"
pub fn context_name(header: &str) -> String {
    let mut name = String::with_capacity(header.len());
    let mut pending_sep = false;
    for c in header.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_sep && !name.is_empty() {
                name.push('_');
            }
            pending_sep = false;
            name.push(c);
        } else {
            pending_sep = true;
        }
    }
    name
}

/// Вариант, прошедший группировку и проверку
#[derive(Debug, Clone, Copy)]
pub struct VariantInput<'a, 't> {
    pub row: SourceRow<'t>,
    pub handle: &'a str,
    pub model: &'a str,
    pub list_price: f64,
    pub is_primary: bool,
    pub options: &'a VariantOptions,
}

/// Собирает запись Shopify из строки поставщика
pub struct RowAssembler<'c> {
    config: &'c ImportConfig,
    formulas: FormulaSet,
    description: DescriptionSynthesizer,
}

impl<'c> RowAssembler<'c> {
    pub fn new(config: &'c ImportConfig, table: &SourceTable, columns: &ColumnMap) -> Self {
        Self {
            config,
            formulas: FormulaSet::compile(config),
            description: DescriptionSynthesizer::new(config, table, columns),
        }
    }

    fn base_context(
        &self,
        grouper: &VariantGrouper<'_>,
        input: &VariantInput<'_, '_>,
        weight: Option<f64>,
    ) -> FormulaContext {
        let config = self.config;
        let mut ctx = FormulaContext::new();
        ctx.insert("vendor", config.vendor.as_str());
        ctx.insert("product_type", config.product_type.as_str());
        ctx.insert("collection", config.collection.as_str());
        ctx.insert("product_category", config.product_category.as_str());
        ctx.insert("image_url", config.image_url.as_str());

        for (header, cell) in input.row.cells() {
            let name = context_name(header);
            if !name.is_empty() {
                ctx.insert_if_absent(name, Value::from_cell(cell));
            }
        }

        let row = &input.row;
        ctx.insert("model", input.model);
        ctx.insert(
            "voltage",
            grouper.field_text(row, CanonicalField::Voltage).as_str(),
        );
        ctx.insert(
            "power",
            Value::from_text(&grouper.field_text(row, CanonicalField::Power)),
        );
        if let Some(w) = weight {
            ctx.insert("weight", w);
        }
        ctx.insert("list_price", input.list_price);
        ctx.insert(
            "part_number",
            grouper.field_text(row, CanonicalField::ArticleNumber).as_str(),
        );
        ctx
    }

    pub fn assemble(
        &self,
        grouper: &VariantGrouper<'_>,
        input: VariantInput<'_, '_>,
    ) -> Result<CanonicalRecord, AssembleError> {
        let config = self.config;
        let formulas = &self.formulas;

        let weight = if config.digital {
            None
        } else {
            let w = grouper
                .columns()
                .get(CanonicalField::Weight)
                .and_then(|h| input.row.get(h))
                .and_then(|c| c.as_number())
                .ok_or(AssembleError::InvalidWeight)?;
            Some(w)
        };

        let mut ctx = self.base_context(grouper, &input, weight);

        let price = formulas.price.strict_number(&ctx)?;
        let cost = formulas.cost.strict_number(&ctx)?;
        let grams = if config.digital {
            "0".to_string()
        } else {
            formulas.grams.strict_number(&ctx)?.to_string()
        };

        let body_html = self.description.build(&input.row, weight);
        ctx.insert("description", body_html.as_str());

        let title = formulas.title.lenient(&ctx);
        ctx.insert("title", title.as_str());
        ctx.insert("price", price.clone());
        ctx.insert("cost", cost.clone());

        let mut record = CanonicalRecord {
            handle: input.handle.to_string(),
            body_html,
            published: "FALSE".to_string(),
            variant_inventory_policy: if config.digital { "continue" } else { "deny" }.to_string(),
            variant_inventory_tracker: if config.digital { "" } else { "shopify" }.to_string(),
            variant_fulfillment_service: "manual".to_string(),
            variant_grams: grams,
            variant_price: price.to_string(),
            variant_compare_at_price: format_float(input.list_price),
            variant_requires_shipping: requires_shipping(weight, config).to_string(),
            variant_taxable: "TRUE".to_string(),
            product_category: config.product_category.clone(),
            gift_card: "FALSE".to_string(),
            google_condition: "new".to_string(),
            google_custom_product: "TRUE".to_string(),
            variant_weight_unit: "lb".to_string(),
            cost_per_item: cost.to_string(),
            status: "draft".to_string(),
            ..CanonicalRecord::default()
        };

        let (name1, value1) = input.options.slot(0);
        let (name2, value2) = input.options.slot(1);
        let (name3, value3) = input.options.slot(2);
        record.option1_name = name1.to_string();
        record.option1_value = value1.to_string();
        record.option2_name = name2.to_string();
        record.option2_value = value2.to_string();
        record.option3_name = name3.to_string();
        record.option3_value = value3.to_string();

        if input.is_primary {
            record.title = title.clone();
            record.vendor = formulas.vendor.lenient(&ctx);
            record.product_type = formulas.product_type.lenient(&ctx);
            record.tags = match &formulas.tags {
                Some(tags) => tags.lenient(&ctx),
                None => default_tags(config),
            };
            record.seo_title = formulas.seo_title.lenient(&ctx);
            record.seo_description = formulas.seo_description.lenient(&ctx);
            record.image_src = config.image_url.clone();
            record.variant_image = config.image_url.clone();
            record.image_position = "1".to_string();
            record.image_alt_text = title;
        }

        let sku = self.sku(grouper, &input, &ctx);
        record.google_mpn = sku.clone();
        record.variant_sku = sku;

        Ok(record)
    }

    fn sku(&self, grouper: &VariantGrouper<'_>, input: &VariantInput<'_, '_>, ctx: &FormulaContext) -> String {
        if let Some(formula) = &self.formulas.sku {
            match formula.strict(ctx) {
                Ok(value) if !value.to_string().trim().is_empty() => return value.to_string(),
                Ok(_) => tracing::warn!("Row {}: SKU formula produced an empty value", input.row.number()),
                Err(e) => tracing::warn!("Row {}: {}, falling back to generated SKU", input.row.number(), e),
            }
        }
        grouper.fallback_sku(&input.row, &self.config.product_type, input.model, input.options)
    }
}

fn requires_shipping(weight: Option<f64>, config: &ImportConfig) -> &'static str {
    match weight {
        _ if config.digital => "FALSE",
        Some(w) if w > config.weight_threshold => "FALSE",
        _ => "TRUE",
    }
}

fn default_tags(config: &ImportConfig) -> String {
    [config.vendor.trim(), config.collection.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::table::csv_reader::parse_csv;
    use crate::usecases::u601_shopify_import::schema_resolver::{resolve_columns, AliasTable};

    const CSV: &str = "Model,Voltage,Power HP,Weight lbs,List Price,Article Number,Flow Rate (GPM)\n\
                       TOP-S 30/10,230,0.5,2,100,2045-01,40\n\
                       TOP-S 30/10,400,0.5,160,100,2045-02,40\n";

    struct Fixture {
        table: SourceTable,
        columns: ColumnMap,
    }

    fn fixture() -> Fixture {
        let table = parse_csv(CSV).unwrap();
        let columns = resolve_columns(table.headers(), &AliasTable::default(), &[]).unwrap();
        Fixture { table, columns }
    }

    fn assemble(
        fx: &Fixture,
        config: &ImportConfig,
        index: usize,
        is_primary: bool,
    ) -> Result<CanonicalRecord, AssembleError> {
        let grouper = VariantGrouper::new(&fx.table, &fx.columns, &config.variant_option_fields);
        let assembler = RowAssembler::new(config, &fx.table, &fx.columns);
        let row = fx.table.row(index).unwrap();
        let options = grouper.options(&row);
        assembler.assemble(
            &grouper,
            VariantInput {
                row,
                handle: "top-s-30-10",
                model: "TOP-S 30/10",
                list_price: 100.0,
                is_primary,
                options: &options,
            },
        )
    }

    fn config() -> ImportConfig {
        ImportConfig {
            vendor: "Wilo".to_string(),
            product_type: "Pump".to_string(),
            collection: "Circulators".to_string(),
            image_url: "https://example.com/top-s.jpg".to_string(),
            ..ImportConfig::default()
        }
    }

    #[test]
    fn test_context_name() {
        assert_eq!(context_name("Flow Rate (GPM)"), "flow_rate_gpm");
        assert_eq!(context_name("  List  Price "), "list_price");
        assert_eq!(context_name("---"), "");
    }

    #[test]
    fn test_primary_record() {
        let fx = fixture();
        let record = assemble(&fx, &config(), 0, true).unwrap();

        assert_eq!(record.handle, "top-s-30-10");
        assert_eq!(record.title, "TOP-S 30/10");
        assert_eq!(record.vendor, "Wilo");
        assert_eq!(record.product_type, "Pump");
        assert_eq!(record.tags, "Wilo, Circulators");
        assert_eq!(record.option1_name, "Voltage");
        assert_eq!(record.option1_value, "230");
        assert_eq!(record.variant_sku, "2045-01");
        assert_eq!(record.google_mpn, "2045-01");
        assert_eq!(record.variant_grams, "907");
        assert_eq!(record.variant_price, "43.56");
        assert_eq!(record.cost_per_item, "36.0");
        assert_eq!(record.variant_compare_at_price, "100.0");
        assert_eq!(record.variant_requires_shipping, "TRUE");
        assert_eq!(record.variant_inventory_tracker, "shopify");
        assert_eq!(record.variant_inventory_policy, "deny");
        assert_eq!(record.image_src, "https://example.com/top-s.jpg");
        assert_eq!(record.image_position, "1");
        assert_eq!(record.image_alt_text, "TOP-S 30/10");
        assert_eq!(record.seo_title, "TOP-S 30/10");
        assert_eq!(record.seo_description, "Buy TOP-S 30/10 online.");
        assert_eq!(record.status, "draft");
        assert!(record.body_html.contains("<strong>Flow Rate (GPM): </strong> 40"));
    }

    #[test]
    fn test_secondary_record_and_heavy_weight() {
        let fx = fixture();
        let record = assemble(&fx, &config(), 1, false).unwrap();

        assert_eq!(record.title, "");
        assert_eq!(record.vendor, "");
        assert_eq!(record.tags, "");
        assert_eq!(record.image_src, "");
        assert_eq!(record.seo_description, "");
        assert_eq!(record.option1_value, "400");
        assert_eq!(record.variant_requires_shipping, "FALSE");
        assert!(record.body_html.contains("NOTE: We will contact you"));
    }

    #[test]
    fn test_formulas_see_row_columns_and_description() {
        let fx = fixture();
        let config = ImportConfig {
            title_formula: "f\"{model} ({voltage}V, {flow_rate_gpm} GPM)\"".to_string(),
            seo_description_formula: "len(description) > 0".to_string(),
            tags_formula: Some("upper(vendor)".to_string()),
            ..config()
        };
        let record = assemble(&fx, &config, 0, true).unwrap();
        assert_eq!(record.title, "TOP-S 30/10 (230V, 40 GPM)");
        assert_eq!(record.tags, "WILO");
        assert_eq!(
            record.seo_description,
            "[Formula Error: comparison is not allowed in: len(description) > 0]"
        );
    }

    #[test]
    fn test_strict_formula_failure_is_row_error() {
        let fx = fixture();
        let config = ImportConfig {
            pricing_formula: "list_price * markup".to_string(),
            ..config()
        };
        let err = assemble(&fx, &config, 0, true).unwrap_err();
        assert!(err.to_string().contains("name 'markup' is not defined"));
    }

    #[test]
    fn test_sku_formula_and_fallback() {
        let fx = fixture();
        let with_formula = ImportConfig {
            sku_formula: Some("f\"WL-{part_number}\"".to_string()),
            ..config()
        };
        assert_eq!(assemble(&fx, &with_formula, 0, true).unwrap().variant_sku, "WL-2045-01");

        let broken = ImportConfig {
            sku_formula: Some("part_number.upper()".to_string()),
            ..config()
        };
        assert_eq!(assemble(&fx, &broken, 0, true).unwrap().variant_sku, "2045-01");
    }

    #[test]
    fn test_digital_mode() {
        let fx = fixture();
        let config = ImportConfig {
            digital: true,
            ..config()
        };
        let record = assemble(&fx, &config, 1, true).unwrap();
        assert_eq!(record.variant_grams, "0");
        assert_eq!(record.variant_requires_shipping, "FALSE");
        assert_eq!(record.variant_inventory_tracker, "");
        assert_eq!(record.variant_inventory_policy, "continue");
        assert!(!record.body_html.contains("NOTE:"));
    }

    #[test]
    fn test_missing_weight() {
        let table = parse_csv("Model,Weight lbs,List Price\nA,-,10\n").unwrap();
        let fx = Fixture {
            columns: resolve_columns(table.headers(), &AliasTable::default(), &[]).unwrap(),
            table,
        };
        let err = assemble(&fx, &config(), 0, true).unwrap_err();
        assert_eq!(err, AssembleError::InvalidWeight);
        assert_eq!(err.to_string(), "Invalid or missing weight");
    }
}
