use sea_orm::prelude::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::entities::recipe;
use crate::db::services::{NewRecipe, RecipeChanges, RecipeFilter, RecipeWithRelations};
use crate::services::image_service::media_url_for;
use crate::web::error::{AppError, FieldErrors};
use crate::web::models::{
    FIELD_BLANK, FIELD_REQUIRED, IngredientResponse, MAX_NAME_LENGTH, NamePayload, PayloadMode,
    TagResponse, too_long_message,
};

const PRICE_MAX_DECIMAL_PLACES: u32 = 2;
const PRICE_MAX_WHOLE_DIGITS: u32 = 3;

const INVALID_INTEGER: &str = "A valid integer is required.";
const INVALID_NUMBER: &str = "A valid number is required.";

/// Body of recipe create, PUT and PATCH requests.
///
/// `tags` / `ingredients` distinguish "absent" (`None`, keep the current
/// associations) from an empty list (clear them).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub title: Option<String>,
    // Raw JSON; type errors are reported per field by `validate`.
    pub time_minutes: Option<Value>,
    pub price: Option<Value>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<NamePayload>>,
    pub ingredients: Option<Vec<NamePayload>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecipe {
    pub changes: RecipeChanges,
    pub tag_names: Option<Vec<String>>,
    pub ingredient_names: Option<Vec<String>>,
}

impl ValidatedRecipe {
    /// Splits a payload validated in `PayloadMode::Full` into create arguments.
    /// Optional text fields default to empty strings, absent lists to no items.
    pub fn into_new_recipe(self) -> (NewRecipe, Vec<String>, Vec<String>) {
        let changes = self.changes;
        let new_recipe = NewRecipe {
            title: changes.title.unwrap_or_default(),
            time_minutes: changes.time_minutes.unwrap_or_default(),
            price: changes.price.unwrap_or_default(),
            link: changes.link.unwrap_or_default(),
            description: changes.description.unwrap_or_default(),
        };
        (
            new_recipe,
            self.tag_names.unwrap_or_default(),
            self.ingredient_names.unwrap_or_default(),
        )
    }
}

impl RecipePayload {
    pub fn validate(self, mode: PayloadMode) -> Result<ValidatedRecipe, AppError> {
        let mut errors = FieldErrors::default();

        let title = match self.title {
            Some(raw) => {
                let title = raw.trim().to_owned();
                if title.is_empty() {
                    errors.add("title", FIELD_BLANK);
                } else if title.chars().count() > MAX_NAME_LENGTH {
                    errors.add("title", too_long_message(MAX_NAME_LENGTH));
                }
                Some(title)
            }
            None => {
                if mode == PayloadMode::Full {
                    errors.add("title", FIELD_REQUIRED);
                }
                None
            }
        };

        let time_minutes = match self.time_minutes {
            Some(raw) => {
                let parsed = parse_integer(&raw);
                if parsed.is_none() {
                    errors.add("time_minutes", INVALID_INTEGER);
                }
                parsed
            }
            None => {
                if mode == PayloadMode::Full {
                    errors.add("time_minutes", FIELD_REQUIRED);
                }
                None
            }
        };

        let price = match self.price {
            Some(raw) => match parse_decimal(&raw) {
                Some(price) => {
                    check_price(price, &mut errors);
                    Some(price)
                }
                None => {
                    errors.add("price", INVALID_NUMBER);
                    None
                }
            },
            None => {
                if mode == PayloadMode::Full {
                    errors.add("price", FIELD_REQUIRED);
                }
                None
            }
        };

        let link = self.link.map(|raw| raw.trim().to_owned());
        if link.as_ref().is_some_and(|link| link.chars().count() > MAX_NAME_LENGTH) {
            errors.add("link", too_long_message(MAX_NAME_LENGTH));
        }

        let tag_names = self.tags.map(|items| collect_names("tags", &items, &mut errors));
        let ingredient_names = self
            .ingredients
            .map(|items| collect_names("ingredients", &items, &mut errors));

        errors.into_result()?;

        Ok(ValidatedRecipe {
            changes: RecipeChanges {
                title,
                time_minutes,
                price,
                link,
                description: self.description,
            },
            tag_names,
            ingredient_names,
        })
    }
}

/// Integers as JSON numbers or numeric strings; fractions are rejected.
fn parse_integer(raw: &Value) -> Option<i32> {
    match raw {
        Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_decimal(raw: &Value) -> Option<Decimal> {
    let text = match raw {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_owned(),
        _ => return None,
    };
    text.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

fn check_price(price: Decimal, errors: &mut FieldErrors) {
    if price.normalize().scale() > PRICE_MAX_DECIMAL_PLACES {
        errors.add(
            "price",
            format!("Ensure that there are no more than {PRICE_MAX_DECIMAL_PLACES} decimal places."),
        );
    }
    if price.abs().trunc() >= Decimal::from(10_i64.pow(PRICE_MAX_WHOLE_DIGITS)) {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {PRICE_MAX_WHOLE_DIGITS} digits before the decimal point."
            ),
        );
    }
}

// Nested items always need a name, whatever the request mode.
fn collect_names(field: &str, items: &[NamePayload], errors: &mut FieldErrors) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| item.check(&format!("{field}[{index}].name"), PayloadMode::Full, errors))
        .collect()
}

/// Query string of the recipe list endpoint: comma separated id lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

impl RecipeListQuery {
    pub fn into_filter(self) -> Result<RecipeFilter, AppError> {
        Ok(RecipeFilter {
            tag_ids: parse_id_list("tags", self.tags.as_deref())?,
            ingredient_ids: parse_id_list("ingredients", self.ingredients.as_deref())?,
        })
    }
}

/// `"1, 2,3"` -> `[1, 2, 3]`. An absent or empty parameter means no filter.
pub fn parse_id_list(param: &str, raw: Option<&str>) -> Result<Option<Vec<i32>>, AppError> {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    raw.split(',')
        .map(|token| {
            token.trim().parse::<i32>().map_err(|_| {
                AppError::InvalidFilter(format!(
                    "'{param}' must be a comma separated list of ids, got '{token}'"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Recipe as it appears in list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagResponse>,
    pub ingredients: Vec<IngredientResponse>,
}

impl From<RecipeWithRelations> for RecipeResponse {
    fn from(loaded: RecipeWithRelations) -> Self {
        let recipe = loaded.recipe;
        // Some backends drop trailing zeros; always answer with two places.
        let mut price = recipe.price;
        price.rescale(PRICE_MAX_DECIMAL_PLACES);
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price,
            link: recipe.link,
            tags: loaded.tags.into_iter().map(TagResponse::from).collect(),
            ingredients: loaded
                .ingredients
                .into_iter()
                .map(IngredientResponse::from)
                .collect(),
        }
    }
}

/// List shape plus the fields only shown for a single recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetailResponse {
    #[serde(flatten)]
    pub recipe: RecipeResponse,
    pub description: String,
    pub image: Option<String>,
}

impl RecipeDetailResponse {
    pub fn new(mut loaded: RecipeWithRelations, media_url: &str) -> Self {
        let description = std::mem::take(&mut loaded.recipe.description);
        let image = loaded
            .recipe
            .image
            .take()
            .map(|path| media_url_for(media_url, &path));
        Self {
            recipe: RecipeResponse::from(loaded),
            description,
            image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeImageResponse {
    pub id: i32,
    pub image: Option<String>,
}

impl RecipeImageResponse {
    pub fn new(model: &recipe::Model, media_url: &str) -> Self {
        Self {
            id: model.id,
            image: model.image.as_deref().map(|path| media_url_for(media_url, path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> RecipePayload {
        serde_json::from_value(serde_json::json!({
            "title": "Soup",
            "time_minutes": 30,
            "price": "5.50",
            "tags": [{"name": "dinner"}, {"name": " easy "}],
        }))
        .unwrap()
    }

    fn field_errors(result: Result<ValidatedRecipe, AppError>) -> FieldErrors {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn full_payload_converts_to_new_recipe() {
        let validated = full_payload().validate(PayloadMode::Full).unwrap();
        let (new_recipe, tags, ingredients) = validated.into_new_recipe();

        assert_eq!(new_recipe.title, "Soup");
        assert_eq!(new_recipe.price, Decimal::new(550, 2));
        assert_eq!(new_recipe.link, "");
        assert_eq!(tags, vec!["dinner", "easy"]);
        assert!(ingredients.is_empty());
    }

    #[test]
    fn full_mode_requires_core_fields() {
        let errors = field_errors(RecipePayload::default().validate(PayloadMode::Full));

        for field in ["title", "time_minutes", "price"] {
            assert_eq!(errors.get(field), Some(&[FIELD_REQUIRED.to_string()][..]), "{field}");
        }
        assert!(errors.get("link").is_none());
    }

    #[test]
    fn partial_mode_keeps_absent_lists_apart_from_empty_ones() {
        let payload: RecipePayload =
            serde_json::from_value(serde_json::json!({ "tags": [] })).unwrap();
        let validated = payload.validate(PayloadMode::Partial).unwrap();

        assert_eq!(validated.tag_names, Some(Vec::new()));
        assert_eq!(validated.ingredient_names, None);
        assert!(validated.changes.is_empty());
    }

    #[test]
    fn nested_names_must_not_be_blank() {
        let payload: RecipePayload = serde_json::from_value(serde_json::json!({
            "ingredients": [{"name": "leek"}, {"name": "  "}, {}],
        }))
        .unwrap();

        let errors = field_errors(payload.validate(PayloadMode::Partial));

        assert!(errors.get("ingredients[0].name").is_none());
        assert_eq!(errors.get("ingredients[1].name"), Some(&[FIELD_BLANK.to_string()][..]));
        assert_eq!(errors.get("ingredients[2].name"), Some(&[FIELD_REQUIRED.to_string()][..]));
    }

    #[test]
    fn price_precision_is_enforced() {
        let mut payload = full_payload();
        payload.price = Some(json!("123.456"));
        assert!(field_errors(payload.clone().validate(PayloadMode::Full)).get("price").is_some());

        payload.price = Some(json!(1000));
        assert!(field_errors(payload.clone().validate(PayloadMode::Full)).get("price").is_some());

        payload.price = Some(json!(999.99));
        assert!(payload.clone().validate(PayloadMode::Full).is_ok());

        // Trailing zeros do not count as decimal places.
        payload.price = Some(json!("5.500"));
        assert!(payload.validate(PayloadMode::Full).is_ok());
    }

    #[test]
    fn wrongly_typed_numbers_are_field_errors() {
        let payload: RecipePayload = serde_json::from_value(json!({
            "title": "Soup",
            "time_minutes": "thirty",
            "price": "abc",
        }))
        .unwrap();

        let errors = field_errors(payload.validate(PayloadMode::Full));

        assert_eq!(errors.get("time_minutes"), Some(&[INVALID_INTEGER.to_string()][..]));
        assert_eq!(errors.get("price"), Some(&[INVALID_NUMBER.to_string()][..]));

        let payload: RecipePayload =
            serde_json::from_value(json!({"time_minutes": 1.5, "price": [1]})).unwrap();
        let errors = field_errors(payload.validate(PayloadMode::Partial));
        assert!(errors.get("time_minutes").is_some());
        assert!(errors.get("price").is_some());
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let payload: RecipePayload =
            serde_json::from_value(json!({"time_minutes": " 45 ", "price": 12})).unwrap();

        let validated = payload.validate(PayloadMode::Partial).unwrap();

        assert_eq!(validated.changes.time_minutes, Some(45));
        assert_eq!(validated.changes.price, Some(Decimal::from(12)));
    }

    #[test]
    fn parses_id_lists() {
        assert_eq!(parse_id_list("tags", Some("1, 2,3")).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(parse_id_list("tags", Some("")).unwrap(), None);
        assert_eq!(parse_id_list("tags", None).unwrap(), None);
    }

    #[test]
    fn non_numeric_filter_is_rejected() {
        let query = RecipeListQuery {
            tags: None,
            ingredients: Some("4,salt".to_string()),
        };
        assert!(matches!(query.into_filter(), Err(AppError::InvalidFilter(_))));
        assert!(matches!(parse_id_list("tags", Some("1,,2")), Err(AppError::InvalidFilter(_))));
    }

    #[test]
    fn detail_response_adds_description_and_image_url() {
        let loaded = RecipeWithRelations {
            recipe: recipe::Model {
                id: 7,
                user_id: 1,
                title: "Soup".to_string(),
                time_minutes: 30,
                price: Decimal::new(550, 2),
                link: String::new(),
                description: "Hot.".to_string(),
                image: Some("uploads/recipe/x.png".to_string()),
            },
            tags: Vec::new(),
            ingredients: Vec::new(),
        };

        let mut whole = loaded.clone();
        whole.recipe.price = Decimal::from(1);
        let whole = serde_json::to_value(RecipeResponse::from(whole)).unwrap();
        assert_eq!(whole["price"], "1.00");

        let summary = serde_json::to_value(RecipeResponse::from(loaded.clone())).unwrap();
        assert!(summary.get("description").is_none());
        assert_eq!(summary["price"], "5.50");

        let detail = serde_json::to_value(RecipeDetailResponse::new(loaded, "/media")).unwrap();
        assert_eq!(detail["id"], 7);
        assert_eq!(detail["description"], "Hot.");
        assert_eq!(detail["image"], "/media/uploads/recipe/x.png");
    }
}
