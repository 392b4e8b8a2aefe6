use std::collections::BTreeMap;

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{Aggregation, CartLine, ShoppingItem, ShoppingList, ShoppingListFile},
    repository::{CartRepository, UserRepository},
    telemetry::SHOPPING_LISTS_GENERATED,
};

pub const REPORT_TITLE: &str = "Foodgram - список покупок";

const REPORT_DATE: &[BorrowedFormatItem<'static>] = format_description!("[day].[month].[year]");
const FILENAME_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[day][month][year][hour][minute]");

#[derive(Clone)]
pub struct ShoppingListService {
    cart_repo: CartRepository,
    user_repo: UserRepository,
}

impl ShoppingListService {
    pub fn new(cart_repo: CartRepository, user_repo: UserRepository) -> Self {
        Self {
            cart_repo,
            user_repo,
        }
    }

    /// Builds the caller's shopping list file. Read-only; the cart is left as is.
    #[instrument(name = "shopping_list.download", skip(self))]
    pub async fn download(&self, user_id: i32) -> AppResult<ShoppingListFile> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

        let lines = self.cart_repo.cart_lines(user_id).await?;

        let items = match aggregate(lines) {
            Aggregation::EmptyCart => return Err(AppError::EmptyCart),
            Aggregation::Items(items) => items,
        };

        let list = ShoppingList {
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            generated_at: OffsetDateTime::now_utc(),
            items,
        };

        let file = ShoppingListFile {
            filename: report_filename(&list)?,
            body: render_report(&list)?,
        };

        SHOPPING_LISTS_GENERATED.add(1, &[]);

        tracing::info!(
            user_id,
            lines = list.items.len(),
            filename = %file.filename,
            "Shopping list generated"
        );

        Ok(file)
    }
}

/// Groups cart lines by `(name, measurement_unit)` and sums their amounts.
///
/// Output is ordered by name, then unit. No rows at all means the cart is empty;
/// rows without an ingredient (a cart recipe with no lines) contribute nothing.
pub fn aggregate<I>(lines: I) -> Aggregation
where
    I: IntoIterator<Item = CartLine>,
{
    let mut saw_cart_entry = false;
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();

    for line in lines {
        saw_cart_entry = true;

        let (Some(name), Some(unit), Some(amount)) =
            (line.name, line.measurement_unit, line.amount)
        else {
            continue;
        };

        *groups.entry((name, unit)).or_insert(0) += i64::from(amount);
    }

    if !saw_cart_entry {
        return Aggregation::EmptyCart;
    }

    Aggregation::Items(
        groups
            .into_iter()
            .map(|((name, measurement_unit), total)| ShoppingItem {
                name,
                measurement_unit,
                total,
            })
            .collect(),
    )
}

pub fn render_report(list: &ShoppingList) -> AppResult<String> {
    let date = list
        .generated_at
        .format(REPORT_DATE)
        .map_err(|e| AppError::Internal(format!("Failed to format report date: {e}")))?;

    let header = format!(
        "{REPORT_TITLE}\nПользователь: {} {}\nДата: {date}\n\n",
        list.first_name, list.last_name
    );

    let lines = list
        .items
        .iter()
        .map(|item| format!("{} ({}) - {}\n", item.name, item.measurement_unit, item.total));

    Ok(std::iter::once(header).chain(lines).collect())
}

pub fn report_filename(list: &ShoppingList) -> AppResult<String> {
    let timestamp = list
        .generated_at
        .format(FILENAME_TIMESTAMP)
        .map_err(|e| AppError::Internal(format!("Failed to format report timestamp: {e}")))?;

    Ok(format!("{}_{}_shopping_list.txt", list.username, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn line(recipe_id: i32, name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            recipe_id,
            name: Some(name.to_string()),
            measurement_unit: Some(unit.to_string()),
            amount: Some(amount),
        }
    }

    fn bare_recipe(recipe_id: i32) -> CartLine {
        CartLine {
            recipe_id,
            name: None,
            measurement_unit: None,
            amount: None,
        }
    }

    fn item(name: &str, unit: &str, total: i64) -> ShoppingItem {
        ShoppingItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total,
        }
    }

    fn anna_list(items: Vec<ShoppingItem>) -> ShoppingList {
        ShoppingList {
            username: "anna".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Ivanova".to_string(),
            generated_at: datetime!(2024-03-05 09:07:00 UTC),
            items,
        }
    }

    #[test]
    fn test_shared_ingredient_is_summed_into_one_line() {
        let lines = vec![
            line(1, "Salt", "g", 5),
            line(1, "Flour", "g", 200),
            line(2, "Salt", "g", 3),
        ];

        assert_eq!(
            aggregate(lines),
            Aggregation::Items(vec![item("Flour", "g", 200), item("Salt", "g", 8)])
        );
    }

    #[test]
    fn test_empty_cart_is_distinct_outcome() {
        assert_eq!(aggregate(Vec::new()), Aggregation::EmptyCart);
    }

    #[test]
    fn test_cart_recipe_without_lines_is_not_empty_cart() {
        assert_eq!(aggregate(vec![bare_recipe(4)]), Aggregation::Items(Vec::new()));
    }

    #[test]
    fn test_groups_by_name_and_unit() {
        let lines = vec![
            line(1, "молоко", "мл", 200),
            line(2, "молоко", "стакан", 1),
            line(3, "молоко", "мл", 300),
        ];

        assert_eq!(
            aggregate(lines),
            Aggregation::Items(vec![
                item("молоко", "мл", 500),
                item("молоко", "стакан", 1),
            ])
        );
    }

    #[test]
    fn test_order_is_independent_of_input_order() {
        let forward = vec![line(1, "b", "g", 1), line(2, "a", "g", 2), line(3, "c", "g", 3)];
        let mut backward = forward.clone();
        backward.reverse();

        assert_eq!(aggregate(forward), aggregate(backward));
    }

    #[test]
    fn test_sum_uses_wide_accumulator() {
        let lines = (0..4).map(|recipe_id| line(recipe_id, "сахар", "г", i32::MAX));

        assert_eq!(
            aggregate(lines),
            Aggregation::Items(vec![item("сахар", "г", 4 * i64::from(i32::MAX))])
        );
    }

    #[test]
    fn test_render_report_format() {
        let list = anna_list(vec![item("Flour", "g", 200), item("Salt", "g", 8)]);

        let report = render_report(&list).expect("report should render");

        assert_eq!(
            report,
            "Foodgram - список покупок\n\
             Пользователь: Anna Ivanova\n\
             Дата: 05.03.2024\n\
             \n\
             Flour (g) - 200\n\
             Salt (g) - 8\n"
        );
    }

    #[test]
    fn test_render_is_stable_apart_from_date() {
        let mut first = anna_list(vec![item("Salt", "g", 8)]);
        let mut second = first.clone();
        second.generated_at = datetime!(2024-03-06 10:00:00 UTC);

        let first_report = render_report(&first).expect("report should render");
        let second_report = render_report(&second).expect("report should render");
        assert_ne!(first_report, second_report);

        first.generated_at = second.generated_at;
        assert_eq!(
            render_report(&first).expect("report should render"),
            second_report
        );
    }

    #[test]
    fn test_report_filename() {
        let list = anna_list(Vec::new());
        assert_eq!(
            report_filename(&list).expect("filename should format"),
            "anna_050320240907_shopping_list.txt"
        );
    }
}
