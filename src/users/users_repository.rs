use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::errors::Result;
use crate::schema::users;

use super::users_model::{NewUser, User};

pub struct UserRepository;

impl UserRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn get_by_id(&self, conn: &mut SqliteConnection, user_id: &str) -> Result<Option<User>> {
        let user = users::table
            .filter(users::id.eq(user_id))
            .first::<User>(conn)
            .optional()?;
        Ok(user)
    }

    pub fn get_timezone(&self, conn: &mut SqliteConnection, user_id: &str) -> Result<Option<String>> {
        let timezone = users::table
            .filter(users::id.eq(user_id))
            .select(users::timezone)
            .first::<Option<String>>(conn)
            .optional()?;
        Ok(timezone.flatten())
    }

    pub fn create(&self, conn: &mut SqliteConnection, user: NewUser) -> Result<User> {
        diesel::insert_into(users::table)
            .values(&user)
            .execute(conn)?;

        let created = users::table
            .filter(users::id.eq(&user.id))
            .first::<User>(conn)?;
        Ok(created)
    }
}

impl Default for UserRepository {
    fn default() -> Self {
        Self::new()
    }
}
