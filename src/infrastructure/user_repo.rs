use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, UserView};
use crate::schema::{profiles, users};

use super::models::{NewUserRow, ProfileRow, UserRow};

fn to_view(user: UserRow, profile: ProfileRow) -> Result<UserView, DomainError> {
    Ok(UserView {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role.parse()?,
        created_at: user.created_at,
        profile: profile.into(),
    })
}

#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn create(&self, user: NewUser) -> Result<UserView, DomainError> {
        user.validate()?;
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let user_id = Uuid::new_v4();
            let row = diesel::insert_into(users::table)
                .values(&NewUserRow {
                    id: user_id,
                    username: user.username.trim().to_string(),
                    email: user.email.trim().to_lowercase(),
                    role: user.role.as_str().to_string(),
                })
                .returning(UserRow::as_returning())
                .get_result(conn)?;

            let profile = diesel::insert_into(profiles::table)
                .values(&ProfileRow::new(user_id, user.profile))
                .returning(ProfileRow::as_returning())
                .get_result(conn)?;

            to_view(row, profile)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<UserView>, DomainError> {
        let mut conn = self.pool.get()?;

        let found = users::table
            .inner_join(profiles::table)
            .filter(users::id.eq(id))
            .select((UserRow::as_select(), ProfileRow::as_select()))
            .first::<(UserRow, ProfileRow)>(&mut conn)
            .optional()?;

        found.map(|(user, profile)| to_view(user, profile)).transpose()
    }
}
