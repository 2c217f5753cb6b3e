use tracing::{debug, instrument, warn};

use taxonomy_core::{
    CatalogError, CatalogResult, ClassId, ClassParam, NewProduct, Product, ProductId,
    ProductValue,
};
use taxonomy_products::{bind_values, ensure_leaf, validate_product};

use super::classes::read_subtree;
use super::{Catalog, finish, hydrate_class_param, load_class, resolve_attributes};
use crate::store::{CatalogStore, CatalogTx};

impl<S: CatalogStore> Catalog<S> {
    /// Create products all-or-nothing; ids come back in input order.
    #[instrument(skip(self, products), fields(count = products.len()), err)]
    pub async fn create_products(&self, products: &[NewProduct]) -> CatalogResult<Vec<ProductId>> {
        let mut tx = self.begin().await?;
        let result = async {
            let mut ids = Vec::with_capacity(products.len());
            for product in products {
                ids.push(create_product(&mut tx, product).await?);
            }
            Ok::<_, CatalogError>(ids)
        }
        .await;
        finish(tx, "create_products", result).await
    }

    /// A product with its class (own params only) and stored values, each
    /// joined to the class param that declared it.
    #[instrument(skip(self), err)]
    pub async fn read_product(&self, id: ProductId) -> CatalogResult<Product> {
        let mut tx = self.begin().await?;
        let result = read_product(&mut tx, id).await;
        finish(tx, "read_product", result).await
    }

    #[instrument(skip(self), err)]
    pub async fn read_class_products(&self, class: ClassId) -> CatalogResult<Vec<Product>> {
        let mut tx = self.begin().await?;
        let result = async {
            if tx.get_class(class).await?.is_none() {
                return Err(CatalogError::not_found(format!("class {} not found", class)));
            }
            let ids = tx.products_of_class(class).await?;
            let mut products = Vec::with_capacity(ids.len());
            for id in ids {
                products.push(read_product(&mut tx, id).await?);
            }
            Ok::<_, CatalogError>(products)
        }
        .await;
        finish(tx, "read_class_products", result).await
    }

    /// Replace product `id` with `product` (delete, then create).
    ///
    /// Values not resubmitted are gone afterwards. Returns the new id.
    #[instrument(skip(self, product), fields(product = %product.name), err)]
    pub async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> CatalogResult<ProductId> {
        let mut tx = self.begin().await?;
        let result = async {
            validate_product(product)?;
            if !tx.delete_product(id).await? {
                return Err(CatalogError::not_found(format!("product {} not found", id)));
            }
            debug!(product = %id, "deleted product for replacement");
            create_product(&mut tx, product).await
        }
        .await;
        finish(tx, "update_product", result).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        let mut tx = self.begin().await?;
        let result = match tx.delete_product(id).await {
            Ok(true) => {
                debug!(product = %id, "deleted product");
                Ok(())
            }
            Ok(false) => Err(CatalogError::not_found(format!("product {} not found", id))),
            Err(e) => Err(e.into()),
        };
        finish(tx, "delete_product", result).await
    }
}

async fn create_product<T: CatalogTx>(tx: &mut T, product: &NewProduct) -> CatalogResult<ProductId> {
    validate_product(product)?;

    let class = read_subtree(tx, &product.class).await?;
    if let Err(err) = ensure_leaf(&class) {
        warn!(product = %product.name, class = %class.name, "rejected product placement");
        return Err(err);
    }

    let closure: Vec<ClassParam> = resolve_attributes(tx, class.id).await?;
    let bound = bind_values(&product.name, &closure, &product.values)?;

    if tx.find_product_by_name(&product.name).await?.is_some() {
        return Err(CatalogError::conflict(format!(
            "product '{}' already exists",
            product.name
        )));
    }

    let id = tx.insert_product(&product.name, class.id).await?;
    for value in &bound {
        tx.insert_product_value(id, value.class_param_id, &value.value)
            .await?;
    }
    debug!(product = %id, class = %class.id, values = bound.len(), "inserted product");
    Ok(id)
}

async fn read_product<T: CatalogTx>(tx: &mut T, id: ProductId) -> CatalogResult<Product> {
    let row = tx
        .get_product(id)
        .await?
        .ok_or_else(|| CatalogError::not_found(format!("product {} not found", id)))?;
    let class = load_class(tx, row.class_id, false).await?;

    let mut values = Vec::new();
    for stored in tx.product_values_of(id).await? {
        let class_param = tx
            .get_class_param(stored.class_param_id)
            .await?
            .ok_or_else(|| {
                CatalogError::internal(format!(
                    "value of product {} references missing class param {}",
                    id, stored.class_param_id
                ))
            })?;
        values.push(ProductValue {
            class_param: hydrate_class_param(tx, class_param).await?,
            value: stored.value,
        });
    }

    Ok(Product {
        id: row.id,
        name: row.name,
        class,
        values,
    })
}
