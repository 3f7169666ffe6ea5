use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_material_catalog::Migration),
            Box::new(m20240301_000002_create_product_catalog::Migration),
            Box::new(m20240301_000003_create_bom_tables::Migration),
        ]
    }
}

mod m20240301_000001_create_material_catalog {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_material_catalog"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MaterialCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaterialCategories::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MaterialCategories::Name).string().not_null())
                        .col(
                            ColumnDef::new(MaterialCategories::HasColor)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(MaterialCategories::HasSize)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(MaterialCategories::QuantityVariesBySize)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(MaterialCategories::MaterialVariesByColor)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(MaterialCategories::HasWaste)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(MaterialCategories::WastePercentage)
                                .decimal_len(9, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MaterialCategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialCategories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Materials::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Materials::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Materials::Name).string().not_null())
                        .col(ColumnDef::new(Materials::CategoryId).integer().not_null())
                        .col(ColumnDef::new(Materials::PurchaseUnitId).integer().not_null())
                        .col(ColumnDef::new(Materials::ConsumptionUnitId).integer().null())
                        .col(
                            ColumnDef::new(Materials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Materials::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_materials_category_id")
                                .from(Materials::Table, Materials::CategoryId)
                                .to(MaterialCategories::Table, MaterialCategories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_materials_category_id")
                        .table(Materials::Table)
                        .col(Materials::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Materials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MaterialCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum MaterialCategories {
        Table,
        Id,
        Name,
        HasColor,
        HasSize,
        QuantityVariesBySize,
        MaterialVariesByColor,
        HasWaste,
        WastePercentage,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Materials {
        Table,
        Id,
        Name,
        CategoryId,
        PurchaseUnitId,
        ConsumptionUnitId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_product_catalog {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_product_catalog"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Code).string().null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductCombinations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductCombinations::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProductCombinations::ProductId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductCombinations::SizeId).integer().not_null())
                        .col(ColumnDef::new(ProductCombinations::ColorId).integer().not_null())
                        .col(
                            ColumnDef::new(ProductCombinations::SizeLabel)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductCombinations::ColorLabel)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductCombinations::ColorHex).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_combinations_product_id")
                                .from(ProductCombinations::Table, ProductCombinations::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("ux_product_combinations_variant")
                        .table(ProductCombinations::Table)
                        .col(ProductCombinations::ProductId)
                        .col(ProductCombinations::SizeId)
                        .col(ProductCombinations::ColorId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductCombinations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Id,
        Name,
        Code,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductCombinations {
        Table,
        Id,
        ProductId,
        SizeId,
        ColorId,
        SizeLabel,
        ColorLabel,
        ColorHex,
    }
}

mod m20240301_000003_create_bom_tables {
    use super::m20240301_000002_create_product_catalog::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_bom_tables"
        }
    }

    fn audit_columns(table: &mut TableCreateStatement) -> &mut TableCreateStatement {
        table
            .col(ColumnDef::new(Audit::CreatedBy).string().not_null())
            .col(
                ColumnDef::new(Audit::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(
                ColumnDef::new(Audit::UpdatedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut common = Table::create();
            common
                .table(BomCommonMaterials::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(BomCommonMaterials::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(BomCommonMaterials::ProductId).integer().not_null())
                .col(ColumnDef::new(BomCommonMaterials::CategoryId).integer().not_null())
                .col(ColumnDef::new(BomCommonMaterials::MaterialId).integer().not_null())
                .col(ColumnDef::new(BomCommonMaterials::UnitId).integer().not_null())
                .col(
                    ColumnDef::new(BomCommonMaterials::BaseQuantity)
                        .decimal_len(19, 4)
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_bom_common_materials_product_id")
                        .from(BomCommonMaterials::Table, BomCommonMaterials::ProductId)
                        .to(Products::Table, Products::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            audit_columns(&mut common);
            manager.create_table(common.to_owned()).await?;

            let mut variations = Table::create();
            variations
                .table(BomVariationMaterials::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(BomVariationMaterials::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(BomVariationMaterials::ProductId)
                        .integer()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(BomVariationMaterials::CategoryId)
                        .integer()
                        .not_null(),
                )
                .col(ColumnDef::new(BomVariationMaterials::ColorId).integer().not_null())
                .col(
                    ColumnDef::new(BomVariationMaterials::MaterialId)
                        .integer()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(BomVariationMaterials::Quantity)
                        .decimal_len(19, 4)
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_bom_variation_materials_product_id")
                        .from(BomVariationMaterials::Table, BomVariationMaterials::ProductId)
                        .to(Products::Table, Products::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            audit_columns(&mut variations);
            manager.create_table(variations.to_owned()).await?;

            let mut sizes = Table::create();
            sizes
                .table(BomSizeConsumptions::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(BomSizeConsumptions::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(BomSizeConsumptions::ProductId).integer().not_null())
                .col(ColumnDef::new(BomSizeConsumptions::CategoryId).integer().not_null())
                .col(ColumnDef::new(BomSizeConsumptions::SizeLabel).string().not_null())
                .col(
                    ColumnDef::new(BomSizeConsumptions::Quantity)
                        .decimal_len(19, 4)
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_bom_size_consumptions_product_id")
                        .from(BomSizeConsumptions::Table, BomSizeConsumptions::ProductId)
                        .to(Products::Table, Products::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            audit_columns(&mut sizes);
            manager.create_table(sizes.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name("ux_bom_common_materials_product_material")
                        .table(BomCommonMaterials::Table)
                        .col(BomCommonMaterials::ProductId)
                        .col(BomCommonMaterials::MaterialId)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("ux_bom_variation_materials_product_category_color")
                        .table(BomVariationMaterials::Table)
                        .col(BomVariationMaterials::ProductId)
                        .col(BomVariationMaterials::CategoryId)
                        .col(BomVariationMaterials::ColorId)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("ux_bom_size_consumptions_product_category_size")
                        .table(BomSizeConsumptions::Table)
                        .col(BomSizeConsumptions::ProductId)
                        .col(BomSizeConsumptions::CategoryId)
                        .col(BomSizeConsumptions::SizeLabel)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                BomSizeConsumptions::Table.into_iden(),
                BomVariationMaterials::Table.into_iden(),
                BomCommonMaterials::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Audit {
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum BomCommonMaterials {
        Table,
        Id,
        ProductId,
        CategoryId,
        MaterialId,
        UnitId,
        BaseQuantity,
    }

    #[derive(DeriveIden)]
    enum BomVariationMaterials {
        Table,
        Id,
        ProductId,
        CategoryId,
        ColorId,
        MaterialId,
        Quantity,
    }

    #[derive(DeriveIden)]
    enum BomSizeConsumptions {
        Table,
        Id,
        ProductId,
        CategoryId,
        SizeLabel,
        Quantity,
    }
}
