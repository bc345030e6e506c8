// src/services/reconcile.rs

//! Reconciliação das coleções filhas do cliente (contatos e endereços).
//!
//! A lista recebida dita o estado final da coleção:
//! - item com id: o registro existente correspondente é atualizado no lugar;
//! - item sem id: um registro novo é criado, já vinculado ao cliente;
//! - registro existente ausente da lista: é removido. Quando NENHUM item
//!   traz id, a coleção inteira é substituída. Clientes da API precisam
//!   reenviar os ids que querem manter.
//!
//! Um id que não pertence ao cliente aborta a operação inteira com
//! `ChildNotOwned`; nada é gravado parcialmente.

use uuid::Uuid;

use crate::common::error::AppError;

/// O plano de escrita de uma coleção filha: ids a remover e o conjunto final
/// de registros (atualizados + recém-criados, na ordem processada).
#[derive(Debug, Clone)]
pub struct ChildWrites<R> {
    pub delete_ids: Vec<Uuid>,
    pub rows: Vec<R>,
}

/// Calcula o plano de reconciliação de uma coleção. Genérico sobre o tipo do
/// registro (`R`) e do item recebido (`I`); os closures fazem a ponte:
/// `id_of` lê o id persistido, `input_id` o id opcional do item, `create`
/// materializa um registro novo e `apply` sobrescreve um existente.
pub fn reconcile_collection<R, I>(
    existing: &[R],
    incoming: &[I],
    id_of: impl Fn(&R) -> Uuid,
    input_id: impl Fn(&I) -> Option<Uuid>,
    create: impl Fn(&I) -> R,
    apply: impl Fn(&I, &mut R),
) -> Result<ChildWrites<R>, AppError>
where
    R: Clone,
{
    let incoming_ids: Vec<Uuid> = incoming.iter().filter_map(&input_id).collect();

    // Ausência implica remoção; sem nenhum id, a lista é substituição total.
    let delete_ids: Vec<Uuid> = if incoming_ids.is_empty() {
        existing.iter().map(&id_of).collect()
    } else {
        existing
            .iter()
            .map(&id_of)
            .filter(|id| !incoming_ids.contains(id))
            .collect()
    };

    let mut rows = Vec::with_capacity(incoming.len());
    for item in incoming {
        match input_id(item) {
            Some(id) => {
                // Id desconhecido ou de outro cliente nunca é adotado
                let found = existing
                    .iter()
                    .find(|row| id_of(row) == id)
                    .ok_or(AppError::ChildNotOwned(id))?;
                let mut row = found.clone();
                apply(item, &mut row);
                rows.push(row);
            }
            None => rows.push(create(item)),
        }
    }

    Ok(ChildWrites { delete_ids, rows })
}
