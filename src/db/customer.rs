use time::OffsetDateTime;
use tokio_postgres::Row;

use super::{user, Client, Error};

#[derive(Clone, Debug)]
pub struct Customer {
    pub id: Id,
    pub user: user::Id,
    pub organization: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<&Row> for Customer {
    type Error = Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user: row.try_get("user_id")?,
            organization: row.try_get("organization")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

uuid_id!(Id);

impl Client {
    pub async fn get_customer_by_user(
        &self,
        user: user::Id,
    ) -> Result<Option<Customer>, Error> {
        const SQL: &str = "\
            SELECT id, user_id, organization, created_at \
            FROM customers \
            WHERE user_id = $1";
        self.0
            .query_opt(SQL, &[&user])
            .await?
            .as_ref()
            .map(Customer::try_from)
            .transpose()
    }
}
