use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "platforms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::game_platforms::Entity")]
    GamePlatforms,
}

impl Related<super::games::Entity> for Entity {
    fn to() -> RelationDef {
        super::game_platforms::Relation::Game.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::game_platforms::Relation::Platform.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
