use serde::{Deserialize, Serialize};

use elast_core::{DomainError, DomainResult, Factor, FormulaId, IngredientId, ProductId};

/// Raw material held in stock (rubber, filler, accelerator, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    /// Unit of measure of the stock quantity (e.g. "kg").
    pub unit: String,
}

impl Ingredient {
    pub fn new(id: IngredientId, name: impl Into<String>, unit: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("ingredient name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            unit: unit.into(),
        })
    }
}

/// One line of a formula: `ratio` of the ingredient per batch-unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaIngredient {
    pub ingredient_id: IngredientId,
    pub ratio: Factor,
}

/// A compound recipe. Lines keep their declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub id: FormulaId,
    pub name: String,
    pub ingredients: Vec<FormulaIngredient>,
}

impl Formula {
    /// A formula with zero ingredients is legal; it propagates nothing.
    pub fn new(id: FormulaId, name: impl Into<String>, ingredients: Vec<FormulaIngredient>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("formula name cannot be empty"));
        }
        for (idx, line) in ingredients.iter().enumerate() {
            if ingredients[..idx].iter().any(|l| l.ingredient_id == line.ingredient_id) {
                return Err(DomainError::validation(format!(
                    "ingredient {} listed twice in formula '{name}'",
                    line.ingredient_id
                )));
            }
        }
        Ok(Self {
            id,
            name,
            ingredients,
        })
    }

    pub fn composition(&self) -> Vec<(IngredientId, Factor)> {
        self.ingredients.iter().map(|l| (l.ingredient_id, l.ratio)).collect()
    }
}

/// One formula used by a product: `fill_weight` of the formula per product unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formulation {
    pub formula_id: FormulaId,
    pub fill_weight: Factor,
}

/// A finished article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub article_no: String,
    pub article_name: String,
    /// Ledger quantity logged per unit consumed when the caller gives none.
    pub unit_weight: Factor,
    pub formulations: Vec<Formulation>,
}

impl Product {
    pub fn new(
        id: ProductId,
        article_no: impl Into<String>,
        article_name: impl Into<String>,
        formulations: Vec<Formulation>,
    ) -> DomainResult<Self> {
        let article_no = article_no.into();
        if article_no.trim().is_empty() {
            return Err(DomainError::validation("article_no cannot be empty"));
        }
        for (idx, f) in formulations.iter().enumerate() {
            if formulations[..idx].iter().any(|o| o.formula_id == f.formula_id) {
                return Err(DomainError::validation(format!(
                    "formula {} listed twice in article {article_no}",
                    f.formula_id
                )));
            }
        }
        Ok(Self {
            id,
            article_no,
            article_name: article_name.into(),
            unit_weight: Factor::ONE,
            formulations,
        })
    }

    pub fn with_unit_weight(mut self, unit_weight: Factor) -> Self {
        self.unit_weight = unit_weight;
        self
    }

    pub fn composition(&self) -> Vec<(FormulaId, Factor)> {
        self.formulations.iter().map(|f| (f.formula_id, f.fill_weight)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_rejects_duplicate_lines() {
        let ing = IngredientId::new();
        let line = FormulaIngredient {
            ingredient_id: ing,
            ratio: Factor::ONE,
        };
        let err = Formula::new(FormulaId::new(), "NBR-70", vec![line, line]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("twice")));
    }

    #[test]
    fn empty_formula_is_legal() {
        let f = Formula::new(FormulaId::new(), "blank", vec![]).unwrap();
        assert!(f.composition().is_empty());
    }

    #[test]
    fn product_defaults_to_unit_weight_one() {
        let p = Product::new(ProductId::new(), "A-100", "Seal ring", vec![]).unwrap();
        assert_eq!(p.unit_weight, Factor::ONE);
    }

    #[test]
    fn composition_keeps_declaration_order() {
        let (a, b, c) = (FormulaId::new(), FormulaId::new(), FormulaId::new());
        let lines = [c, a, b]
            .into_iter()
            .map(|formula_id| Formulation {
                formula_id,
                fill_weight: Factor::ONE,
            })
            .collect();
        let p = Product::new(ProductId::new(), "A-1", "", lines).unwrap();
        let order: Vec<FormulaId> = p.composition().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![c, a, b]);
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(Ingredient::new(IngredientId::new(), "  ", "kg").is_err());
        assert!(Formula::new(FormulaId::new(), "", vec![]).is_err());
        assert!(Product::new(ProductId::new(), "", "x", vec![]).is_err());
    }
}
