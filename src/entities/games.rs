use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    /// Cleared when the publisher is deleted.
    pub publisher_id: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub summary: String,
    pub year: i32,
    pub price: f64,
    pub number_in_stock: String,
    pub img_src: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::publishers::Entity",
        from = "Column::PublisherId",
        to = "super::publishers::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Publisher,
    #[sea_orm(has_many = "super::game_genres::Entity")]
    GameGenres,
    #[sea_orm(has_many = "super::game_platforms::Entity")]
    GamePlatforms,
}

impl Related<super::publishers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Publisher.def()
    }
}

impl Related<super::genres::Entity> for Entity {
    fn to() -> RelationDef {
        super::game_genres::Relation::Genre.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::game_genres::Relation::Game.def().rev())
    }
}

impl Related<super::platforms::Entity> for Entity {
    fn to() -> RelationDef {
        super::game_platforms::Relation::Platform.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::game_platforms::Relation::Game.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
